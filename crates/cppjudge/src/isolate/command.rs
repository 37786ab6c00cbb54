//! Command builder for the Isolate CLI

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::{BoxLimits, MountConfig};

/// Builder for Isolate command-line arguments
///
/// Network access is never shared into the box: isolate only enables it with
/// `--share-net`, which this builder does not emit.
#[derive(Debug)]
pub struct IsolateCommand {
    isolate_path: PathBuf,
    action: IsolateAction,
    /// --box-id
    box_id: u32,
    limits: BoxLimits,
    mounts: Vec<MountConfig>,
    /// --env, sorted for stable argument order
    env: BTreeMap<String, String>,
    /// --meta
    meta_file: Option<PathBuf>,
    /// --stdin
    stdin: Option<PathBuf>,
    /// --stdout
    stdout: Option<PathBuf>,
    /// --stderr
    stderr: Option<PathBuf>,
    working_dir: Option<String>,
    command: Vec<String>,
    cgroup: bool,
}

impl IsolateCommand {
    pub fn new(isolate_path: impl Into<PathBuf>, box_id: u32) -> Self {
        Self {
            isolate_path: isolate_path.into(),
            action: IsolateAction::Run,
            box_id,
            limits: BoxLimits::default(),
            mounts: Vec::new(),
            env: BTreeMap::new(),
            meta_file: None,
            stdin: None,
            stdout: None,
            stderr: None,
            working_dir: None,
            command: Vec::new(),
            cgroup: false,
        }
    }

    pub fn action(mut self, action: IsolateAction) -> Self {
        self.action = action;
        self
    }

    pub fn limits(mut self, limits: BoxLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn mounts(mut self, mounts: impl IntoIterator<Item = MountConfig>) -> Self {
        self.mounts.extend(mounts);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn meta_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.meta_file = Some(path.into());
        self
    }

    pub fn stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    pub fn stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = Some(path.into());
        self
    }

    /// Working directory inside the sandbox
    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn command(mut self, cmd: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.command = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Enable cgroup support for memory limiting
    pub fn cgroup(mut self, enable: bool) -> Self {
        self.cgroup = enable;
        self
    }

    /// Build the command-line arguments, program first
    pub fn build(self) -> Vec<String> {
        let mut args = vec![self.isolate_path.to_string_lossy().into_owned()];

        args.push(format!("--box-id={}", self.box_id));

        if self.cgroup {
            args.push("--cg".to_string());
        }

        match self.action {
            IsolateAction::Init => args.push("--init".to_string()),
            IsolateAction::Cleanup => args.push("--cleanup".to_string()),
            IsolateAction::Run => {
                args.push("--run".to_string());
                push_limits(&mut args, &self.limits, self.cgroup);

                for mount in &self.mounts {
                    if mount.optional && !std::path::Path::new(&mount.source).exists() {
                        continue;
                    }
                    let mut opts = String::new();
                    if mount.writable {
                        opts.push_str(":rw");
                    }
                    if mount.optional {
                        opts.push_str(":maybe");
                    }
                    args.push(format!("--dir={}={}{}", mount.target, mount.source, opts));
                }

                for (key, value) in &self.env {
                    args.push(format!("--env={key}={value}"));
                }

                if let Some(ref meta) = self.meta_file {
                    args.push(format!("--meta={}", meta.display()));
                }
                if let Some(ref stdin) = self.stdin {
                    args.push(format!("--stdin={}", stdin.display()));
                }
                if let Some(ref stdout) = self.stdout {
                    args.push(format!("--stdout={}", stdout.display()));
                }
                if let Some(ref stderr) = self.stderr {
                    args.push(format!("--stderr={}", stderr.display()));
                }
                if let Some(ref dir) = self.working_dir {
                    args.push(format!("--chdir={dir}"));
                }

                args.push("--".to_string());
                args.extend(self.command);
            }
        }

        args
    }
}

/// Smallest `--mem` value passed without cgroups, in kilobytes
///
/// `--mem` caps address space rather than resident memory, and `cc1plus`
/// reserves far more address space than it touches.
pub const ADDRESS_SPACE_FLOOR_KB: u64 = 1024 * 1024;

fn push_limits(args: &mut Vec<String>, limits: &BoxLimits, cgroup: bool) {
    if let Some(time) = limits.time_limit {
        args.push(format!("--time={time}"));
    }
    if let Some(wall_time) = limits.wall_time_limit {
        args.push(format!("--wall-time={wall_time}"));
    }
    if let Some(extra_time) = limits.extra_time {
        args.push(format!("--extra-time={extra_time}"));
    }
    if let Some(memory) = limits.memory_limit {
        if cgroup {
            args.push(format!("--cg-mem={memory}"));
        } else {
            args.push(format!("--mem={}", memory.max(ADDRESS_SPACE_FLOOR_KB)));
        }
    }
    if let Some(stack) = limits.stack_limit {
        args.push(format!("--stack={stack}"));
    }
    if let Some(procs) = limits.max_processes {
        args.push(format!("--processes={procs}"));
    }
    if let Some(fsize) = limits.max_output {
        args.push(format!("--fsize={fsize}"));
    }
    if let Some(open_files) = limits.max_open_files {
        args.push(format!("--open-files={open_files}"));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolateAction {
    /// Initialize a new box
    Init,
    /// Run a command in the box
    Run,
    /// Clean up a box
    Cleanup,
}
