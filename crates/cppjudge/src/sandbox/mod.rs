//! Sandbox backends
//!
//! A [`Sandbox`] runs one shell command line over a set of files under
//! resource limits and reports how it ended. Each call gets its own isolated
//! workspace; nothing carries over between calls.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

pub use crate::sandbox::isolate::IsolateSandbox;
use crate::types::{ResourceLimits, RunResult};

mod isolate;

/// Failures to provide an isolated run at all
///
/// A program that crashes, times out or runs out of memory is not an error;
/// it is a [`RunResult`] with a non-zero exit code.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox unavailable: {0}")]
    Unavailable(String),

    #[error("profile '{0}' is not configured")]
    ProfileNotFound(String),

    #[error("invalid file name '{0}'")]
    InvalidFile(String),
}

/// Everything needed for one sandboxed invocation
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    /// Toolchain environment to run under
    pub profile: &'a str,
    /// Shell command line, typically `compile && run`
    pub command: &'a str,
    /// File name to contents, written into the working directory
    pub files: &'a BTreeMap<String, Vec<u8>>,
    pub limits: &'a ResourceLimits,
    /// Fed to the command's standard input
    pub stdin: &'a [u8],
}

#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Run `request` in a fresh isolated context
    async fn execute(&self, request: &RunRequest<'_>) -> Result<RunResult, SandboxError>;

    async fn run(
        &self,
        profile: &str,
        command: &str,
        files: &BTreeMap<String, Vec<u8>>,
        limits: &ResourceLimits,
        stdin: &[u8],
    ) -> Result<RunResult, SandboxError> {
        self.execute(&RunRequest {
            profile,
            command,
            files,
            limits,
            stdin,
        })
        .await
    }
}

/// Check that a submitted file name stays inside the working directory
pub fn validate_file_name(name: &str) -> Result<(), SandboxError> {
    let escapes = name.is_empty()
        || name.starts_with('/')
        || name.split('/').any(|part| part == ".." || part.is_empty());
    if escapes {
        return Err(SandboxError::InvalidFile(name.to_owned()));
    }
    Ok(())
}
