use serde::{Deserialize, Serialize};

/// Per-evaluation resource ceilings, applied identically to every test case
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU time ceiling in seconds
    pub cpu_time_seconds: f64,

    /// Memory ceiling in bytes
    pub memory_bytes: u64,
}

impl ResourceLimits {
    /// 1 kibibyte in bytes
    pub const KIB: u64 = 1024;
    /// 1 mebibyte in bytes
    pub const MIB: u64 = 1024 * 1024;

    pub fn new(cpu_time_seconds: f64, memory_bytes: u64) -> Self {
        Self {
            cpu_time_seconds,
            memory_bytes,
        }
    }

    /// Set the CPU time ceiling in seconds
    pub fn with_cpu_time(mut self, seconds: f64) -> Self {
        self.cpu_time_seconds = seconds;
        self
    }

    /// Set the memory ceiling in bytes
    pub fn with_memory_bytes(mut self, bytes: u64) -> Self {
        self.memory_bytes = bytes;
        self
    }

    /// Memory ceiling in kilobytes, rounded up
    pub fn memory_kb(&self) -> u64 {
        self.memory_bytes.div_ceil(Self::KIB)
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_time_seconds: 1.0,
            memory_bytes: 64 * Self::MIB,
        }
    }
}

/// Low-level limits handed to isolate for a single box run
///
/// Every field is optional so that profile settings and request limits can be
/// layered with [`with_overrides`](Self::with_overrides).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxLimits {
    /// CPU time limit in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,

    /// Wall clock time limit in seconds
    #[serde(default)]
    pub wall_time_limit: Option<f64>,

    /// Memory limit in kilobytes
    #[serde(default)]
    pub memory_limit: Option<u64>,

    /// Stack size limit in kilobytes
    #[serde(default)]
    pub stack_limit: Option<u64>,

    /// Maximum number of processes/threads
    #[serde(default)]
    pub max_processes: Option<u32>,

    /// Maximum output file size in kilobytes
    #[serde(default)]
    pub max_output: Option<u64>,

    /// Maximum open files
    #[serde(default)]
    pub max_open_files: Option<u32>,

    /// Extra time before killing (grace period) in seconds
    #[serde(default)]
    pub extra_time: Option<f64>,
}

impl BoxLimits {
    /// Ceilings suitable for compiling and running a small C++ program
    ///
    /// CPU time and memory are left unset; they come from the evaluation's
    /// [`ResourceLimits`].
    pub fn toolchain_defaults() -> Self {
        Self {
            time_limit: None,
            wall_time_limit: Some(10.0),
            memory_limit: None,
            stack_limit: Some(65536),
            max_processes: Some(16),
            max_output: Some(16384),
            max_open_files: Some(64),
            extra_time: Some(0.5),
        }
    }

    /// Apply overrides from another BoxLimits, preferring values from `overrides`
    pub fn with_overrides(&self, overrides: &BoxLimits) -> BoxLimits {
        BoxLimits {
            time_limit: overrides.time_limit.or(self.time_limit),
            wall_time_limit: overrides.wall_time_limit.or(self.wall_time_limit),
            memory_limit: overrides.memory_limit.or(self.memory_limit),
            stack_limit: overrides.stack_limit.or(self.stack_limit),
            max_processes: overrides.max_processes.or(self.max_processes),
            max_output: overrides.max_output.or(self.max_output),
            max_open_files: overrides.max_open_files.or(self.max_open_files),
            extra_time: overrides.extra_time.or(self.extra_time),
        }
    }
}

impl From<&ResourceLimits> for BoxLimits {
    fn from(limits: &ResourceLimits) -> Self {
        BoxLimits {
            time_limit: Some(limits.cpu_time_seconds),
            memory_limit: Some(limits.memory_kb()),
            ..Default::default()
        }
    }
}

/// Outcome of one sandboxed invocation
///
/// Produced fresh by a [`Sandbox`](crate::sandbox::Sandbox) for every call.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Exit code of the command; never 0 unless the process exited normally
    pub exit_code: i32,

    /// Captured standard output
    pub stdout: Vec<u8>,

    /// Captured standard error
    pub stderr: Vec<u8>,

    /// How the sandboxed process ended
    pub status: ExecutionStatus,

    /// Which resource limit was exceeded, if any
    pub limit_exceeded: LimitExceeded,

    /// CPU time used in seconds
    pub time: f64,

    /// Peak memory usage in kilobytes
    pub memory: u64,
}

impl RunResult {
    /// A result for a process that exited on its own with `exit_code`
    pub fn exited(exit_code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        let status = if exit_code == 0 {
            ExecutionStatus::Ok
        } else {
            ExecutionStatus::RuntimeError
        };
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            status,
            limit_exceeded: LimitExceeded::NotExceeded,
            time: 0.0,
            memory: 0,
        }
    }

    /// Check if the run exited normally with code 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Ok) && self.exit_code == 0
    }
}

/// Status of an execution
/// Corresponds to IOI Isolate two-letter status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Program exited normally
    #[serde(rename = "OK")]
    Ok,

    /// Runtime error (non-zero exit code)
    #[serde(rename = "RE")]
    RuntimeError,

    /// Time limit exceeded
    #[serde(rename = "TO")]
    TimeLimitExceeded,

    /// Program was killed by a signal
    #[serde(rename = "SG")]
    Signaled,

    /// Internal error in Isolate
    #[serde(rename = "XX")]
    InternalError,
}

impl ExecutionStatus {
    /// Parse status from isolate meta file status string
    pub fn from_isolate_status(status: &str) -> Self {
        match status {
            "OK" => ExecutionStatus::Ok,
            "RE" => ExecutionStatus::RuntimeError,
            "TO" => ExecutionStatus::TimeLimitExceeded,
            "SG" => ExecutionStatus::Signaled,
            _ => ExecutionStatus::InternalError,
        }
    }
}

/// Secondary status indicating which resource limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LimitExceeded {
    #[default]
    #[serde(rename = "none")]
    NotExceeded,

    /// CPU time limit exceeded
    #[serde(rename = "time")]
    Time,

    /// Wall clock time limit exceeded
    #[serde(rename = "wall_time")]
    WallTime,

    /// Memory limit exceeded
    #[serde(rename = "memory")]
    Memory,

    /// Output limit exceeded
    #[serde(rename = "output")]
    Output,
}

impl LimitExceeded {
    /// Infer which limit was exceeded from isolate's message field
    pub fn from_message(message: Option<&str>) -> Self {
        let Some(msg) = message else {
            return LimitExceeded::NotExceeded;
        };

        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("time limit") {
            if msg_lower.contains("wall") {
                LimitExceeded::WallTime
            } else {
                LimitExceeded::Time
            }
        } else if msg_lower.contains("memory") {
            LimitExceeded::Memory
        } else if msg_lower.contains("output") {
            LimitExceeded::Output
        } else {
            LimitExceeded::NotExceeded
        }
    }

    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        !matches!(self, LimitExceeded::NotExceeded)
    }
}

/// Configuration for a directory mount in Isolate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Source path on the host
    pub source: String,

    /// Target path in the sandbox
    pub target: String,

    /// Whether the mount is read-write (default: read-only)
    #[serde(default)]
    pub writable: bool,

    /// Don't fail if the source doesn't exist (isolate's `:maybe` flag)
    #[serde(default)]
    pub optional: bool,
}
