//! Configuration file loading for cppjudge
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (id, profile) in &self.profiles {
            if profile.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "profile '{id}' has empty name"
                )));
            }
            if profile.shell.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "profile '{id}' has empty shell"
                )));
            }
        }

        if !self.profiles.contains_key(&self.grading.profile) {
            return Err(ConfigError::ProfileNotFound(self.grading.profile.clone()));
        }

        if self.grading.command.trim().is_empty() {
            return Err(ConfigError::Invalid("grading command is empty".to_owned()));
        }

        let source_name = &self.grading.source_name;
        if source_name.is_empty() || source_name.contains("..") || source_name.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "grading source name '{source_name}' must be a relative file name"
            )));
        }

        if self.box_pool.count == 0 {
            return Err(ConfigError::Invalid("box pool must hold at least one box".to_owned()));
        }

        let limits = &self.default_limits;
        if limits.cpu_time_seconds.is_nan() || limits.cpu_time_seconds <= 0.0 || limits.memory_bytes == 0 {
            return Err(ConfigError::Invalid(
                "default limits must be positive".to_owned(),
            ));
        }

        Ok(())
    }
}
