use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{BoxLimits, MountConfig};

/// Default PATH for sandbox execution
pub const DEFAULT_SANDBOX_PATH: &str = "/usr/bin:/bin";

/// Toolchain environment a sandbox run executes in
///
/// A profile does not know what it runs; the grading command is passed in
/// per call and wrapped with [`shell_command`](Self::shell_command).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Human-readable name (e.g., "C++ (GCC)")
    pub name: String,

    /// Interpreter used to run the command line
    #[serde(default = "default_shell")]
    pub shell: Vec<String>,

    /// PATH environment variable inside the sandbox
    #[serde(default = "default_sandbox_path")]
    pub path: String,

    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Directory mounts in addition to the global sandbox mounts
    #[serde(default)]
    pub mounts: Vec<MountConfig>,

    /// Limits layered over the toolchain defaults
    #[serde(default)]
    pub limits: Option<BoxLimits>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shell: default_shell(),
            path: default_sandbox_path(),
            env: HashMap::new(),
            mounts: Vec::new(),
            limits: None,
        }
    }

    /// Effective base limits for this profile
    pub fn box_limits(&self) -> BoxLimits {
        let base = BoxLimits::toolchain_defaults();
        match self.limits {
            Some(ref limits) => base.with_overrides(limits),
            None => base,
        }
    }

    /// Argument vector that runs `command` through the profile's shell
    pub fn shell_command(&self, command: &str) -> Vec<String> {
        let mut argv = self.shell.clone();
        argv.push(command.to_owned());
        argv
    }
}

fn default_shell() -> Vec<String> {
    vec!["/bin/sh".to_owned(), "-c".to_owned()]
}

fn default_sandbox_path() -> String {
    DEFAULT_SANDBOX_PATH.to_owned()
}
