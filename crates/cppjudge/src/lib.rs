//! Sandboxed grading of C++ submissions.
//!
//! cppjudge compiles and runs a submission once per test case inside an IOI
//! Isolate box, compares what it prints with the expected output and reports
//! a single verdict for the whole suite.
//!
//! # Features
//!
//! - **Sandboxed execution**: every run gets a fresh box with no network and bounded CPU time and memory.
//! - **Short-circuit grading**: cases run in order and grading stops at the first failure.
//! - **Lenient comparison**: spaces and newlines are ignored when comparing output.
//! - **Pluggable backends**: the grader talks to a [`Sandbox`] trait object.
//! - **TOML configuration**: toolchain profiles, box pool and default limits.
//! - **cgroup v2 support**: memory limiting in container environments.
//!
//! ```rust,ignore
//! let config = Config::default();
//! let sandbox = Arc::new(IsolateSandbox::new(config.clone())?);
//! let grader = Grader::new(sandbox, config.grading.clone());
//!
//! let suite = TestSuite::from_json(r#"[["5\n", "10\n"]]"#)?;
//! let verdict = grader
//!     .evaluate(&grader.submission(source), &suite, &config.default_limits)
//!     .await?;
//! ```

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, GradingConfig, Profile};
pub use grader::{GradeError, Grader, RunOutput};
pub use isolate::{BoxPool, IsolateError, prepare_cgroup};
pub use output::{matches, normalize};
pub use sandbox::{IsolateSandbox, RunRequest, Sandbox, SandboxError};
pub use suite::{SourceSubmission, SuiteError, TestCase, TestSuite};
pub use types::{ExecutionStatus, LimitExceeded, MountConfig, ResourceLimits, RunResult};
pub use verdict::Verdict;

pub mod config;
pub mod grader;
pub mod isolate;
pub mod output;
pub mod sandbox;
pub mod suite;
pub mod types;
pub mod verdict;
