use cppjudge::config::{Config, ConfigError};
use cppjudge::ResourceLimits;

use super::fixture_path;

#[test]
fn test_load_valid_config() {
    let config = Config::from_file(fixture_path("configs", "valid_full.toml"))
        .expect("Failed to load config");

    assert!(config.profiles.contains_key("cpp17"));
    assert_eq!(config.box_pool.start_id, 50);
    assert_eq!(config.box_pool.count, 2);
    assert_eq!(
        config.default_limits,
        ResourceLimits::new(2.0, 128 * ResourceLimits::MIB)
    );
    assert_eq!(config.grading.profile, "cpp17");
    assert_eq!(config.grading.source_name, "solution.cpp");

    let profile = config.get_profile("cpp17").unwrap();
    assert_eq!(profile.env.get("lang").map(String::as_str), Some("C.UTF-8"));
    let limits = profile.box_limits();
    assert_eq!(limits.wall_time_limit, Some(20.0));
    assert_eq!(limits.max_processes, Some(32));
    assert_eq!(limits.stack_limit, Some(65536));
}

#[test]
fn test_load_minimal_config() {
    let config = Config::from_file(fixture_path("configs", "valid_minimal.toml"))
        .expect("Failed to load config");

    assert!(config.profiles.contains_key("cpp"));
    assert_eq!(config.grading.command, "g++ main.cpp -o main && ./main");
    assert_eq!(config.default_limits, ResourceLimits::default());
}

#[test]
fn test_load_invalid_empty_name() {
    let result = Config::from_file(fixture_path("configs", "invalid_empty_name.toml"));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_invalid_unknown_profile() {
    let result = Config::from_file(fixture_path("configs", "invalid_unknown_profile.toml"));
    assert!(matches!(result, Err(ConfigError::ProfileNotFound(ref p)) if p == "clang"));
}

#[test]
fn test_load_invalid_source_name() {
    let result = Config::from_file(fixture_path("configs", "invalid_source_name.toml"));
    assert!(result.is_err());
}

#[test]
fn test_load_invalid_zero_memory() {
    let result = Config::from_file(fixture_path("configs", "invalid_zero_memory.toml"));
    assert!(result.is_err());
}

#[test]
fn test_load_missing_file() {
    let result = Config::from_file(fixture_path("configs", "does_not_exist.toml"));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_example_config_matches_default() {
    let config = Config::parse_toml(cppjudge::EXAMPLE_CONFIG).unwrap();
    assert_eq!(config.grading, Config::default().grading);
    assert!(config.profiles.contains_key("cpp"));
}
