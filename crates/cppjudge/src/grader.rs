//! Grading a submission against a test suite

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::GradingConfig;
use crate::output::{matches, normalize};
use crate::sandbox::{Sandbox, SandboxError};
use crate::suite::{SourceSubmission, TestSuite};
use crate::types::ResourceLimits;
use crate::verdict::Verdict;

/// Errors that stop an evaluation without producing a verdict
#[derive(Debug, Error)]
pub enum GradeError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("evaluation cancelled after {completed} test cases")]
    Cancelled { completed: usize },
}

/// Normalized result of a free run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs submissions through a [`Sandbox`] and turns the results into verdicts
///
/// Test cases run one at a time, in suite order, and grading stops at the
/// first case that fails. Nothing is retried or cached.
#[derive(Clone)]
pub struct Grader {
    sandbox: Arc<dyn Sandbox>,
    grading: GradingConfig,
}

impl Grader {
    pub fn new(sandbox: Arc<dyn Sandbox>, grading: GradingConfig) -> Self {
        Self { sandbox, grading }
    }

    /// Wrap `source` under the configured source file name
    pub fn submission(&self, source: impl Into<String>) -> SourceSubmission {
        SourceSubmission::new(self.grading.source_name.clone(), source)
    }

    /// Grade `submission` against every case of `suite`
    pub async fn evaluate(
        &self,
        submission: &SourceSubmission,
        suite: &TestSuite,
        limits: &ResourceLimits,
    ) -> Result<Verdict, GradeError> {
        self.evaluate_with_cancel(submission, suite, limits, &CancellationToken::new())
            .await
    }

    /// Like [`evaluate`](Self::evaluate), checking `cancel` before each case
    #[instrument(skip_all, fields(cases = suite.len(), file = submission.file_name()))]
    pub async fn evaluate_with_cancel(
        &self,
        submission: &SourceSubmission,
        suite: &TestSuite,
        limits: &ResourceLimits,
        cancel: &CancellationToken,
    ) -> Result<Verdict, GradeError> {
        let files = submission.files();

        for (completed, case) in suite.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(completed, "evaluation cancelled");
                return Err(GradeError::Cancelled { completed });
            }

            let test_index = completed + 1;
            let result = self
                .sandbox
                .run(
                    &self.grading.profile,
                    &self.grading.command,
                    &files,
                    limits,
                    case.input.as_bytes(),
                )
                .await?;

            let actual_output = normalize(&result.stdout);
            let expected_output = normalize(&case.expected_output);
            let correct = result.is_success() && matches(&actual_output, &expected_output);

            debug!(
                test_index,
                exit_code = result.exit_code,
                status = ?result.status,
                limit = ?result.limit_exceeded,
                correct,
                "test case finished"
            );

            if !correct {
                info!(test_index, exit_code = result.exit_code, "evaluation failed");
                return Ok(Verdict::Fail {
                    test_index,
                    exit_code: result.exit_code,
                    input: case.input.clone(),
                    expected_output,
                    actual_output,
                    stderr: normalize(&result.stderr),
                });
            }
        }

        info!(passed = suite.len(), "evaluation passed");
        Ok(Verdict::pass(suite.len()))
    }

    /// Run `submission` once on `stdin` without comparing its output
    #[instrument(skip_all, fields(file = submission.file_name()))]
    pub async fn run_code(
        &self,
        submission: &SourceSubmission,
        stdin: &str,
        limits: &ResourceLimits,
    ) -> Result<RunOutput, GradeError> {
        let result = self
            .sandbox
            .run(
                &self.grading.profile,
                &self.grading.command,
                &submission.files(),
                limits,
                stdin.as_bytes(),
            )
            .await?;

        debug!(exit_code = result.exit_code, "run finished");

        Ok(RunOutput {
            exit_code: result.exit_code,
            stdout: normalize(&result.stdout),
            stderr: normalize(&result.stderr),
        })
    }
}
