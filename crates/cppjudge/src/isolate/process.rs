//! Running commands inside an isolate box

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, instrument};

use crate::isolate::IsolateError;
use crate::isolate::box_manager::IsolateBox;
use crate::isolate::command::IsolateCommand;
use crate::isolate::meta::MetaFile;
use crate::types::RunResult;

/// Reserved names for the redirected streams
pub const STDIN_FILE: &str = ".stdin";
pub const STDOUT_FILE: &str = ".stdout";
pub const STDERR_FILE: &str = ".stderr";

/// Kept in the box root, out of reach of the sandboxed program
const META_FILE: &str = ".meta";

/// Names a submission may not use because [`run_batch`] owns them
pub const RESERVED_FILES: [&str; 3] = [STDIN_FILE, STDOUT_FILE, STDERR_FILE];

/// Run a command in an isolate box with batch I/O
///
/// `stdin_data` is written to a file in the box and fed to the command; the
/// command's stdout and stderr are redirected to files and read back after it
/// ends. The meta file is written outside the working directory, so only
/// isolate can produce it. A missing meta file means isolate itself failed,
/// reported as [`IsolateError::CommandFailed`] with isolate's own stderr.
#[instrument(skip_all, fields(box_id = sandbox.id()))]
pub async fn run_batch(
    sandbox: &IsolateBox,
    command: IsolateCommand,
    stdin_data: &[u8],
) -> Result<RunResult, IsolateError> {
    let meta_path = sandbox.private_path(META_FILE)?;
    match tokio::fs::remove_file(&meta_path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    // isolate needs the stdin file to exist even when empty
    sandbox.write_file(STDIN_FILE, stdin_data).await?;

    let args = command
        .meta_file(&meta_path)
        .stdin(sandbox.sandbox_path(STDIN_FILE)?)
        .stdout(sandbox.sandbox_path(STDOUT_FILE)?)
        .stderr(sandbox.sandbox_path(STDERR_FILE)?)
        .build();
    debug!(?args, "running isolate command");

    let output = Command::new(&args[0])
        .args(&args[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(IsolateError::SpawnFailed)?;

    let meta = match tokio::fs::try_exists(&meta_path).await {
        Ok(true) => MetaFile::load(&meta_path).await?,
        _ => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IsolateError::CommandFailed(stderr.trim().to_owned()));
        }
    };

    let stdout = sandbox.read_file_opt(STDOUT_FILE).await?.unwrap_or_default();
    let stderr = sandbox.read_file_opt(STDERR_FILE).await?.unwrap_or_default();
    let result = meta.to_run_result(stdout, stderr);

    debug!(
        status = ?result.status,
        exit_code = result.exit_code,
        time = result.time,
        memory = result.memory,
        "execution complete"
    );

    Ok(result)
}
