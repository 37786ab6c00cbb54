//! IOI Isolate wrapper
//!
//! Command building, box lifecycle, batch runs and meta-file parsing for the
//! isolate sandbox. [`crate::sandbox::IsolateSandbox`] is built on top of it.
//!
//! References for Isolate's CLI arguments and meta-files:
//! - https://www.ucw.cz/isolate/isolate.1.html
//! - https://github.com/ioi/isolate

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

pub use crate::isolate::box_manager::{BoxPool, IsolateBox};
pub use crate::isolate::command::{IsolateAction, IsolateCommand};
pub use crate::isolate::meta::MetaFile;
pub use crate::isolate::process::{RESERVED_FILES, run_batch};
use crate::types::MountConfig;

mod box_manager;
mod command;
mod meta;
mod process;

/// Errors from driving the isolate binary
#[derive(Debug, Error)]
pub enum IsolateError {
    #[error("failed to initialize box {id}: {message}")]
    InitFailed { id: u32, message: String },

    #[error("failed to cleanup box {id}: {message}")]
    CleanupFailed { id: u32, message: String },

    #[error("isolate command failed: {0}")]
    CommandFailed(String),

    #[error("failed to spawn isolate process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("no available boxes in pool")]
    PoolExhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("mount source path does not exist: {0}")]
    MountSourceNotFound(String),
}

const CGROUP_BASE: &str = "/sys/fs/cgroup";

fn has_controller(list: &str, name: &str) -> bool {
    list.split_whitespace().any(|c| c == name)
}

/// Set up the cgroup v2 hierarchy isolate expects under `cg_root`
///
/// Container hosts lack `isolate-cg-keeper`, so this moves the current
/// process into a leaf cgroup, enables the memory and pids controllers and
/// creates `cg_root`. Returns `Ok(false)` when cgroup v2 or its memory
/// controller is unavailable; callers then fall back to RLIMIT_AS limits.
pub fn prepare_cgroup(cg_root: &Path) -> Result<bool, IsolateError> {
    let base = Path::new(CGROUP_BASE);

    let controllers_path = base.join("cgroup.controllers");
    if !controllers_path.exists() {
        debug!("cgroup v2 not mounted");
        return Ok(false);
    }
    if !has_controller(&fs::read_to_string(&controllers_path)?, "memory") {
        debug!("memory controller unavailable");
        return Ok(false);
    }

    if let Ok(subtree) = fs::read_to_string(cg_root.join("cgroup.subtree_control"))
        && has_controller(&subtree, "memory")
    {
        return Ok(true);
    }

    // cgroup v2 forbids enabling controllers on a cgroup that holds processes
    let leaf = base.join("init");
    fs::create_dir_all(&leaf)?;
    fs::write(leaf.join("cgroup.procs"), std::process::id().to_string())?;
    fs::write(base.join("cgroup.subtree_control"), "+memory +pids")?;

    fs::create_dir_all(cg_root)?;
    fs::write(cg_root.join("cgroup.subtree_control"), "+memory +pids")?;

    Ok(true)
}

/// Check that every required mount source exists on the host
pub fn validate_mounts(mounts: &[MountConfig]) -> Result<(), IsolateError> {
    match mounts
        .iter()
        .find(|m| !m.optional && !Path::new(&m.source).exists())
    {
        Some(missing) => Err(IsolateError::MountSourceNotFound(missing.source.clone())),
        None => Ok(()),
    }
}
