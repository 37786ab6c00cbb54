//! Submissions and test suites
//!
//! A suite travels as a JSON list of `[input, expected_output]` pairs. Parsing
//! happens up front so a malformed suite is rejected before any sandbox is
//! provisioned.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing a test suite
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("test suite is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("test case {index} must be a two-element [input, expected_output] array")]
    Shape { index: usize },
}

/// Source code submitted for grading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSubmission {
    file_name: String,
    source: String,
}

impl SourceSubmission {
    pub fn new(file_name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            source: source.into(),
        }
    }

    /// Logical file name the source is written to (e.g. `main.cpp`)
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// File set materialized into the sandbox for each run
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        BTreeMap::from([(self.file_name.clone(), self.source.as_bytes().to_vec())])
    }
}

/// A single input/expected-output pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

impl From<(String, String)> for TestCase {
    fn from((input, expected_output): (String, String)) -> Self {
        Self {
            input,
            expected_output,
        }
    }
}

impl From<TestCase> for (String, String) {
    fn from(case: TestCase) -> Self {
        (case.input, case.expected_output)
    }
}

/// Ordered list of test cases; order decides the reported failing index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestSuite(Vec<TestCase>);

impl TestSuite {
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self(cases)
    }

    /// Parse a suite from its JSON form
    ///
    /// Entries that are not exactly two strings are reported with their
    /// 1-based position so authors can find the broken case.
    pub fn from_json(json: &str) -> Result<Self, SuiteError> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;

        let cases = entries
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| match entry {
                serde_json::Value::Array(pair) => match pair.as_slice() {
                    [serde_json::Value::String(input), serde_json::Value::String(expected)] => {
                        Ok(TestCase::new(input.as_str(), expected.as_str()))
                    }
                    _ => Err(SuiteError::Shape { index: idx + 1 }),
                },
                _ => Err(SuiteError::Shape { index: idx + 1 }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(cases))
    }

    /// Serialize back to the `[[input, expected], ...]` form
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("string pairs always serialize")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestCase> {
        self.0.iter()
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.0
    }
}

impl From<Vec<TestCase>> for TestSuite {
    fn from(cases: Vec<TestCase>) -> Self {
        Self(cases)
    }
}

impl<'a> IntoIterator for &'a TestSuite {
    type Item = &'a TestCase;
    type IntoIter = std::slice::Iter<'a, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} test case(s)", self.0.len())
    }
}
