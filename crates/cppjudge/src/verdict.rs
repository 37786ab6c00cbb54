use serde::{Deserialize, Serialize};

/// Terminal result of grading one submission against a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Verdict {
    /// Every test case exited with code 0 and produced matching output
    Pass { message: String, passed_count: usize },

    /// The first test case that failed; later cases were not run
    Fail {
        /// 1-based position of the failing case in the suite
        test_index: usize,
        exit_code: i32,
        /// Input exactly as given in the suite
        input: String,
        /// Normalized expected output
        expected_output: String,
        /// Normalized program output
        actual_output: String,
        /// Normalized program stderr
        stderr: String,
    },
}

impl Verdict {
    pub fn pass(passed_count: usize) -> Self {
        Verdict::Pass {
            message: format!("Your program passed all {passed_count} test cases!"),
            passed_count,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass { .. })
    }

    /// Score in `[0, 1]`: 1.0 for a pass, 0.0 otherwise
    pub fn score(&self) -> f64 {
        if self.is_pass() { 1.0 } else { 0.0 }
    }
}
