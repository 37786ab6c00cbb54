use cppjudge::isolate::MetaFile;
use cppjudge::types::{ExecutionStatus, LimitExceeded};

use super::fixture_path;

fn load_meta_fixture(name: &str) -> MetaFile {
    let path = fixture_path("meta", name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read meta fixture {path}: {e}"));
    MetaFile::parse(&content)
}

#[test]
fn test_meta_success() {
    let meta = load_meta_fixture("success.meta");
    let result = meta.to_run_result(b"10\n".to_vec(), Vec::new());

    assert!(result.is_success());
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.memory, 3456);
    assert!((result.time - 0.042).abs() < 0.001);
    assert_eq!(result.limit_exceeded, LimitExceeded::NotExceeded);
}

#[test]
fn test_meta_tle() {
    let meta = load_meta_fixture("tle.meta");
    let result = meta.to_run_result(Vec::new(), Vec::new());

    assert_eq!(result.status, ExecutionStatus::TimeLimitExceeded);
    assert_eq!(result.limit_exceeded, LimitExceeded::Time);
    assert_ne!(result.exit_code, 0);
    assert_eq!(result.stderr, b"Time limit exceeded");
}

#[test]
fn test_meta_wall_tle() {
    let meta = load_meta_fixture("wall_tle.meta");
    assert_eq!(meta.limit_exceeded(), LimitExceeded::WallTime);
    assert_ne!(meta.effective_exit_code(), 0);
}

#[test]
fn test_meta_mle() {
    let meta = load_meta_fixture("mle.meta");
    let result = meta.to_run_result(Vec::new(), Vec::new());

    assert_eq!(result.status, ExecutionStatus::Signaled);
    assert_eq!(result.limit_exceeded, LimitExceeded::Memory);
    assert_eq!(result.exit_code, 137);
    assert_eq!(result.memory, 65536);
}

#[test]
fn test_meta_segfault() {
    let meta = load_meta_fixture("segfault.meta");
    let result = meta.to_run_result(Vec::new(), Vec::new());

    assert_eq!(result.exit_code, 139);
    assert_eq!(result.limit_exceeded, LimitExceeded::NotExceeded);
    assert_eq!(result.stderr, b"Caught fatal signal 11");
}

#[test]
fn test_meta_runtime_error() {
    let meta = load_meta_fixture("runtime_error.meta");
    let result = meta.to_run_result(b"10\n".to_vec(), b"giving up\n".to_vec());

    assert_eq!(result.status, ExecutionStatus::RuntimeError);
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.stderr, b"giving up\n");
}

#[test]
fn test_meta_internal_error() {
    let meta = load_meta_fixture("internal_error.meta");
    let result = meta.to_run_result(Vec::new(), Vec::new());

    assert_eq!(result.status, ExecutionStatus::InternalError);
    assert_eq!(result.exit_code, -1);
    assert!(String::from_utf8_lossy(&result.stderr).contains("execve"));
}
