use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::config::{Config, Profile};
use crate::isolate::{
    BoxPool, IsolateBox, IsolateCommand, IsolateError, RESERVED_FILES, run_batch, validate_mounts,
};
use crate::sandbox::{RunRequest, Sandbox, SandboxError, validate_file_name};
use crate::types::{BoxLimits, RunResult};

/// Working directory of the boxed process
const BOX_DIR: &str = "/box";

fn unavailable(err: IsolateError) -> SandboxError {
    SandboxError::Unavailable(err.to_string())
}

/// [`Sandbox`] backed by IOI Isolate
///
/// Every call takes a box from the pool, runs `shell -c <command>` in it and
/// cleans the box up again, whatever the outcome.
#[derive(Debug)]
pub struct IsolateSandbox {
    config: Config,
    pool: BoxPool,
}

impl IsolateSandbox {
    /// Fails when a required mount source is missing on the host
    pub fn new(config: Config) -> Result<Self, SandboxError> {
        validate_mounts(&config.sandbox_mounts).map_err(unavailable)?;
        for profile in config.profiles.values() {
            validate_mounts(&profile.mounts).map_err(unavailable)?;
        }

        let pool = BoxPool::new(
            config.box_pool.start_id,
            config.box_pool.count,
            config.isolate_binary(),
            config.cgroup,
        );
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &BoxPool {
        &self.pool
    }

    async fn run_in_box(
        &self,
        sandbox: &IsolateBox,
        profile: &Profile,
        request: &RunRequest<'_>,
    ) -> Result<RunResult, SandboxError> {
        for (name, content) in request.files {
            sandbox
                .write_file(name, content)
                .await
                .map_err(unavailable)?;
        }

        let command = box_command(
            self.pool.isolate_path(),
            sandbox.id(),
            &self.config,
            profile,
            request,
        );
        run_batch(sandbox, command, request.stdin)
            .await
            .map_err(unavailable)
    }
}

/// Isolate `--run` invocation for one request
fn box_command(
    isolate_path: &Path,
    box_id: u32,
    config: &Config,
    profile: &Profile,
    request: &RunRequest<'_>,
) -> IsolateCommand {
    let limits = profile
        .box_limits()
        .with_overrides(&BoxLimits::from(request.limits));

    let mut command = IsolateCommand::new(isolate_path, box_id)
        .cgroup(config.cgroup)
        .limits(limits)
        .mounts(config.sandbox_mounts.iter().cloned())
        .mounts(profile.mounts.iter().cloned())
        .env("PATH", &profile.path)
        .env("HOME", BOX_DIR)
        .working_dir(BOX_DIR)
        .command(profile.shell_command(request.command));

    for (key, value) in &profile.env {
        command = command.env(key, value);
    }
    command
}

#[async_trait]
impl Sandbox for IsolateSandbox {
    #[instrument(skip_all, fields(profile = request.profile, files = request.files.len()))]
    async fn execute(&self, request: &RunRequest<'_>) -> Result<RunResult, SandboxError> {
        let profile = self
            .config
            .get_profile(request.profile)
            .map_err(|_| SandboxError::ProfileNotFound(request.profile.to_owned()))?;

        for name in request.files.keys() {
            validate_file_name(name)?;
            if RESERVED_FILES.contains(&name.as_str()) {
                return Err(SandboxError::InvalidFile(name.clone()));
            }
        }

        let mut sandbox = self.pool.acquire().await.map_err(unavailable)?;
        debug!(box_id = sandbox.id(), "box acquired");

        let outcome = self.run_in_box(&sandbox, profile, request).await;

        if let Err(e) = sandbox.cleanup().await {
            warn!(box_id = sandbox.id(), error = %e, "failed to clean up box");
        }

        outcome
    }
}
