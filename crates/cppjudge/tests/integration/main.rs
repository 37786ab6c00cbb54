//! Integration tests for cppjudge
//!
//! Fixture-driven tests run anywhere. Tests that drive the isolate binary
//! need root and are marked `#[ignore]`.
//! Run with: cargo test -p cppjudge --features integration-tests
//!
//! To include the isolate tests:
//!    cargo test -p cppjudge --features integration-tests -- --include-ignored

#![cfg(feature = "integration-tests")]

use std::fs;
use std::sync::Arc;

use cppjudge::config::Config;
use cppjudge::{Grader, IsolateSandbox, ResourceLimits, TestSuite};

mod config_loading;
mod grading;
mod meta_file_fixtures;
mod sandbox_lifecycle;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

pub(crate) fn fixture_path(kind: &str, name: &str) -> String {
    format!("{FIXTURES_PATH}/{kind}/{name}")
}

/// Contents of a C++ source fixture
pub(crate) fn fixture_source(name: &str) -> String {
    let path = fixture_path("sources", name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Parsed suite fixture
pub(crate) fn fixture_suite(name: &str) -> TestSuite {
    let path = fixture_path("suites", name);
    let json =
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"));
    TestSuite::from_json(&json).unwrap_or_else(|e| panic!("Invalid suite {path}: {e}"))
}

/// Default config with cgroup support if available, falling back to non-cgroup mode.
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    if config.cgroup {
        match cppjudge::prepare_cgroup(&config.cg_root) {
            Ok(true) => {}
            _ => config.cgroup = false,
        }
    }
    config
}

/// Limits with room for g++, which runs under the same limits as the program
pub(crate) fn test_limits() -> ResourceLimits {
    ResourceLimits::new(5.0, 512 * ResourceLimits::MIB)
}

/// Grader over a real isolate sandbox using the given box range
pub(crate) fn test_grader(start_id: u32, count: u32) -> Grader {
    let mut config = test_config();
    config.box_pool.start_id = start_id;
    config.box_pool.count = count;
    let sandbox = IsolateSandbox::new(config.clone()).expect("Failed to create sandbox");
    Grader::new(Arc::new(sandbox), config.grading.clone())
}
