use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::profile::{DEFAULT_SANDBOX_PATH, Profile};
use crate::types::{MountConfig, ResourceLimits};

mod loader;
pub mod profile;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../cppjudge.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("profile '{0}' not found in configuration")]
    ProfileNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Range of isolate box ids available to concurrent runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BoxPoolConfig {
    #[serde(default)]
    pub start_id: u32,

    #[serde(default = "default_pool_count")]
    pub count: u32,
}

impl Default for BoxPoolConfig {
    fn default() -> Self {
        Self {
            start_id: 0,
            count: default_pool_count(),
        }
    }
}

/// How each test case is built and executed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GradingConfig {
    /// Profile the runs execute under
    #[serde(default = "default_grading_profile")]
    pub profile: String,

    /// Shell command line that compiles then runs the submission
    #[serde(default = "default_grading_command")]
    pub command: String,

    /// File name the submission is written to
    #[serde(default = "default_source_name")]
    pub source_name: String,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            profile: default_grading_profile(),
            command: default_grading_command(),
            source_name: default_source_name(),
        }
    }
}

/// Config for cppjudge
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the Isolate binary (uses PATH if not specified).
    #[serde(default)]
    pub isolate_path: Option<PathBuf>,

    /// Use cgroup memory limiting instead of RLIMIT_AS.
    ///
    /// When enabled, isolate uses `--cg` and `--cg-mem` which limit actual
    /// memory usage rather than virtual address space.
    #[serde(default = "default_cgroup")]
    pub cgroup: bool,

    /// Cgroup root path for isolate. Must match isolate's `cg_root` config value.
    #[serde(default = "default_cg_root")]
    pub cg_root: PathBuf,

    #[serde(default)]
    pub box_pool: BoxPoolConfig,

    /// Global directory mounts applied to every sandbox run
    #[serde(default)]
    pub sandbox_mounts: Vec<MountConfig>,

    /// Limits used when a grading request doesn't supply its own
    #[serde(default)]
    pub default_limits: ResourceLimits,

    #[serde(default)]
    pub grading: GradingConfig,

    /// Toolchain profiles keyed by profile ID
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Config {
    /// Create a new config with the embedded default profiles
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no profiles
    pub fn empty() -> Self {
        Self {
            isolate_path: None,
            cgroup: default_cgroup(),
            cg_root: default_cg_root(),
            box_pool: BoxPoolConfig::default(),
            sandbox_mounts: Vec::new(),
            default_limits: ResourceLimits::default(),
            grading: GradingConfig::default(),
            profiles: HashMap::new(),
        }
    }

    /// Get a profile by ID
    pub fn get_profile(&self, id: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(id)
            .ok_or_else(|| ConfigError::ProfileNotFound(id.to_string()))
    }

    /// Get the path to the isolate binary
    pub fn isolate_binary(&self) -> PathBuf {
        self.isolate_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("isolate"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_cgroup() -> bool {
    true
}

fn default_cg_root() -> PathBuf {
    PathBuf::from("/sys/fs/cgroup/isolate")
}

fn default_pool_count() -> u32 {
    4
}

fn default_grading_profile() -> String {
    "cpp".to_owned()
}

fn default_grading_command() -> String {
    "g++ main.cpp -o main && ./main".to_owned()
}

fn default_source_name() -> String {
    "main.cpp".to_owned()
}
