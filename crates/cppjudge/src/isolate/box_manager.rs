//! Box lifecycle management for isolate

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs::OpenOptions;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};

use crate::isolate::IsolateError;
use crate::isolate::command::{IsolateAction, IsolateCommand};

/// Run a non-`--run` isolate action for box `id`
async fn run_action(
    isolate_path: &Path,
    id: u32,
    action: IsolateAction,
    cgroup: bool,
) -> Result<std::process::Output, IsolateError> {
    let args = IsolateCommand::new(isolate_path, id)
        .action(action)
        .cgroup(cgroup)
        .build();
    debug!(?args, "running isolate");

    Command::new(&args[0])
        .args(&args[1..])
        .output()
        .await
        .map_err(IsolateError::SpawnFailed)
}

fn stderr_message(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}

/// Reject names that would escape the box directory
fn check_name(name: &str) -> Result<(), IsolateError> {
    if name.is_empty() || name.starts_with('/') || name.split('/').any(|part| part == "..") {
        return Err(IsolateError::InvalidPath(format!(
            "path traversal not allowed: {name}"
        )));
    }
    Ok(())
}

/// An initialized isolate box
///
/// Call [`cleanup`](Self::cleanup) before dropping. Dropping an initialized
/// box logs a warning and runs cleanup on a detached thread.
#[derive(Debug)]
pub struct IsolateBox {
    id: u32,
    /// Host directory isolate created for the box
    box_path: PathBuf,
    isolate_path: PathBuf,
    initialized: bool,
    cgroup: bool,
    /// Held while the box is checked out of a pool
    _lease: Option<BoxLease>,
}

impl IsolateBox {
    /// Run `isolate --init` for box `id`
    #[instrument(skip(isolate_path))]
    pub async fn init(
        id: u32,
        isolate_path: impl Into<PathBuf>,
        cgroup: bool,
    ) -> Result<Self, IsolateError> {
        let isolate_path = isolate_path.into();

        let output = run_action(&isolate_path, id, IsolateAction::Init, cgroup).await?;
        if !output.status.success() {
            return Err(IsolateError::InitFailed {
                id,
                message: stderr_message(&output),
            });
        }

        let box_path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        if !box_path.exists() {
            return Err(IsolateError::InitFailed {
                id,
                message: format!("box path does not exist: {}", box_path.display()),
            });
        }

        debug!(?box_path, "box initialized");

        Ok(Self {
            id,
            box_path,
            isolate_path,
            initialized: true,
            cgroup,
            _lease: None,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Host path of the box directory
    pub fn path(&self) -> &Path {
        &self.box_path
    }

    /// Host path of a file next to the box's working directory
    ///
    /// The box root is not mounted inside the sandbox, so the program cannot
    /// touch files kept here.
    pub fn private_path(&self, name: &str) -> Result<PathBuf, IsolateError> {
        check_name(name)?;
        Ok(self.box_path.join(name))
    }

    /// Host path of a file in the box's working directory
    pub fn file_path(&self, name: &str) -> Result<PathBuf, IsolateError> {
        check_name(name)?;
        Ok(self.box_path.join("box").join(name))
    }

    /// Path of a file as seen from inside the sandbox, where the working
    /// directory is mounted at `/box`
    pub fn sandbox_path(&self, name: &str) -> Result<PathBuf, IsolateError> {
        check_name(name)?;
        Ok(PathBuf::from("/box").join(name))
    }

    /// Write a file into the box's working directory, creating parent directories
    #[instrument(skip(self, content))]
    pub async fn write_file(&self, name: &str, content: &[u8]) -> Result<(), IsolateError> {
        let path = self.file_path(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        debug!(?path, len = content.len(), "wrote file to box");
        Ok(())
    }

    /// Read a file the program left in the box, or `None` when it never created it
    ///
    /// The working directory is writable from inside the sandbox, so symlinks
    /// and anything other than a regular file are refused rather than followed.
    pub async fn read_file_opt(&self, name: &str) -> Result<Option<Vec<u8>>, IsolateError> {
        let path = self.file_path(name)?;
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOFOLLOW | libc::O_NONBLOCK)
            .open(&path)
            .await;

        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.raw_os_error() == Some(libc::ELOOP) => {
                warn!(?path, "ignoring symlink left in box");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if !file.metadata().await?.is_file() {
            warn!(?path, "ignoring non-regular file left in box");
            return Ok(None);
        }

        let mut content = Vec::new();
        file.read_to_end(&mut content).await?;
        Ok(Some(content))
    }

    /// Run `isolate --cleanup` for this box
    #[must_use = "cleanup errors should be handled"]
    #[instrument(skip(self), fields(id = self.id))]
    pub async fn cleanup(&mut self) -> Result<(), IsolateError> {
        if !self.initialized {
            return Ok(());
        }

        let output =
            run_action(&self.isolate_path, self.id, IsolateAction::Cleanup, self.cgroup).await?;
        if !output.status.success() {
            let message = stderr_message(&output);
            warn!(stderr = %message, "cleanup failed");
            return Err(IsolateError::CleanupFailed {
                id: self.id,
                message,
            });
        }

        self.initialized = false;
        debug!("box cleaned up");
        Ok(())
    }

    /// A box handle over an existing directory, without running isolate
    #[cfg(test)]
    pub(crate) fn detached(
        id: u32,
        box_path: impl Into<PathBuf>,
        isolate_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            box_path: box_path.into(),
            isolate_path: isolate_path.into(),
            initialized: false,
            cgroup: false,
            _lease: None,
        }
    }

    fn with_lease(mut self, lease: BoxLease) -> Self {
        self._lease = Some(lease);
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Drop for IsolateBox {
    fn drop(&mut self) {
        if !self.initialized {
            return;
        }

        warn!(
            box_id = self.id,
            box_path = %self.box_path.display(),
            "box dropped without cleanup, cleaning up in the background"
        );

        let args = IsolateCommand::new(&self.isolate_path, self.id)
            .action(IsolateAction::Cleanup)
            .cgroup(self.cgroup)
            .build();
        let id = self.id;

        std::thread::spawn(move || {
            match std::process::Command::new(&args[0]).args(&args[1..]).output() {
                Ok(output) if output.status.success() => {
                    debug!(box_id = id, "background cleanup succeeded");
                }
                Ok(output) => {
                    warn!(
                        box_id = id,
                        stderr = %String::from_utf8_lossy(&output.stderr),
                        "background cleanup failed"
                    );
                }
                Err(e) => warn!(box_id = id, error = %e, "background cleanup spawn failed"),
            }
        });
    }
}

/// A box id checked out of a [`BoxPool`]; the id is returned on drop
#[derive(Debug)]
struct BoxLease {
    id: u32,
    free: Arc<Mutex<Vec<u32>>>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for BoxLease {
    fn drop(&mut self) {
        if let Ok(mut free) = self.free.lock() {
            free.push(self.id);
        }
    }
}

/// Fixed range of box ids shared by concurrent runs
///
/// No two boxes acquired from the same pool share an id while both are alive.
#[derive(Debug)]
pub struct BoxPool {
    count: u32,
    isolate_path: PathBuf,
    cgroup: bool,
    semaphore: Arc<Semaphore>,
    free: Arc<Mutex<Vec<u32>>>,
}

impl BoxPool {
    pub fn new(start_id: u32, count: u32, isolate_path: impl Into<PathBuf>, cgroup: bool) -> Self {
        // Popped from the back, so the lowest id goes out first
        let free = (start_id..start_id.saturating_add(count)).rev().collect();
        Self {
            count,
            isolate_path: isolate_path.into(),
            cgroup,
            semaphore: Arc::new(Semaphore::new(count as usize)),
            free: Arc::new(Mutex::new(free)),
        }
    }

    /// Wait for a free id and initialize a box with it
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<IsolateBox, IsolateError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| IsolateError::PoolExhausted)?;

        let id = self
            .free
            .lock()
            .map_err(|_| IsolateError::PoolExhausted)?
            .pop()
            .ok_or(IsolateError::PoolExhausted)?;
        let lease = BoxLease {
            id,
            free: Arc::clone(&self.free),
            _permit: permit,
        };

        debug!(id, "acquired box from pool");

        let sandbox = IsolateBox::init(id, &self.isolate_path, self.cgroup).await?;
        Ok(sandbox.with_lease(lease))
    }

    /// Number of boxes that can be acquired without waiting
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> u32 {
        self.count
    }

    pub fn isolate_path(&self) -> &Path {
        &self.isolate_path
    }
}
