//! Meta file parsing for isolate
//!
//! Isolate writes one `key:value` pair per line describing how the boxed
//! process ended. [`MetaFile::to_run_result`] turns that into a [`RunResult`].

use std::collections::HashMap;
use std::path::Path;

use crate::isolate::IsolateError;
use crate::types::{ExecutionStatus, LimitExceeded, RunResult};

/// Exit code reported when isolate gives neither an exit code nor a signal
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Offset added to a terminating signal number, as shells do
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Parsed meta file from Isolate
#[derive(Debug, Clone, Default)]
pub struct MetaFile {
    pub entries: HashMap<String, String>,
}

impl MetaFile {
    /// Parse meta file content, skipping malformed lines
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| line.split_once(':'))
            .filter_map(|(key, value)| {
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_owned(), value.trim().to_owned()))
            })
            .collect();

        Self { entries }
    }

    /// Load and parse a meta file from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IsolateError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Execution status; a missing `status` line means the process exited normally
    pub fn status(&self) -> ExecutionStatus {
        self.get("status")
            .map(ExecutionStatus::from_isolate_status)
            .unwrap_or(ExecutionStatus::Ok)
    }

    /// CPU time used in seconds
    pub fn time(&self) -> f64 {
        self.get_parsed("time").unwrap_or(0.0)
    }

    /// Peak memory in kilobytes, preferring the cgroup figure
    pub fn memory(&self) -> u64 {
        self.get_parsed("cg-mem")
            .or_else(|| self.get_parsed("max-rss"))
            .unwrap_or(0)
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.get_parsed("exitcode")
    }

    pub fn signal(&self) -> Option<i32> {
        self.get_parsed("exitsig")
    }

    pub fn message(&self) -> Option<&str> {
        self.get("message")
    }

    /// Which limit was exceeded, from the OOM flag, then the message, then the status
    pub fn limit_exceeded(&self) -> LimitExceeded {
        if self.get("cg-oom-killed").is_some() {
            return LimitExceeded::Memory;
        }

        let from_message = LimitExceeded::from_message(self.message());
        if from_message.is_exceeded() {
            return from_message;
        }

        if self.status() == ExecutionStatus::TimeLimitExceeded {
            return LimitExceeded::Time;
        }

        LimitExceeded::NotExceeded
    }

    /// Exit code as the grader sees it
    ///
    /// A normal exit reports the process's own code. A signal death reports
    /// `128 + signal`. Any other abnormal end reports [`UNKNOWN_EXIT_CODE`].
    /// The result is only 0 when the status is OK.
    pub fn effective_exit_code(&self) -> i32 {
        let status = self.status();
        if status == ExecutionStatus::Ok {
            return self.exit_code().unwrap_or(0);
        }

        if let Some(signal) = self.signal() {
            return SIGNAL_EXIT_BASE + signal;
        }

        match self.exit_code() {
            Some(code) if code != 0 => code,
            _ => UNKNOWN_EXIT_CODE,
        }
    }

    /// Build a run result from this meta file and the captured streams
    ///
    /// When the sandbox killed the process, isolate's message is appended to
    /// stderr so that it reaches the verdict.
    pub fn to_run_result(&self, stdout: Vec<u8>, mut stderr: Vec<u8>) -> RunResult {
        let status = self.status();
        let limit_exceeded = self.limit_exceeded();

        let killed = limit_exceeded.is_exceeded()
            || matches!(
                status,
                ExecutionStatus::TimeLimitExceeded
                    | ExecutionStatus::Signaled
                    | ExecutionStatus::InternalError
            );
        if killed && let Some(message) = self.message() {
            if !stderr.is_empty() && !stderr.ends_with(b"\n") {
                stderr.push(b'\n');
            }
            stderr.extend_from_slice(message.as_bytes());
        }

        RunResult {
            exit_code: self.effective_exit_code(),
            stdout,
            stderr,
            status,
            limit_exceeded,
            time: self.time(),
            memory: self.memory(),
        }
    }
}
