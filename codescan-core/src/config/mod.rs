//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
}

/// Scan run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Root directory for all run artifacts (per-unit directories,
    /// `scanner.log`, `manifest.json`)
    pub output_root: PathBuf,
    /// Maximum number of unit processes alive at any instant
    pub max_concurrent_units: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("scan-output"),
            max_concurrent_units: 4,
        }
    }
}

/// Worker process configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Explicit path to the `codescan-worker` binary; when unset the pool
    /// discovers it from known build locations and `PATH`
    pub worker_path: Option<PathBuf>,
}

/// Logging configuration for the tracing diagnostics layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    pub const LEVELS: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];
    pub const FORMATS: [&'static str; 2] = ["text", "json"];
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.scan.max_concurrent_units == 0 {
            return Err(ValidationError::scan(
                "max_concurrent_units must be at least 1",
            ));
        }
        if self.scan.output_root.as_os_str().is_empty() {
            return Err(ValidationError::scan("output_root must not be empty"));
        }
        if let Some(path) = &self.worker.worker_path
            && path.as_os_str().is_empty()
        {
            return Err(ValidationError::worker("worker_path must not be empty"));
        }
        if !LoggingConfig::LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ValidationError::logging(format!(
                "unknown log level `{}` (expected one of {:?})",
                self.logging.level,
                LoggingConfig::LEVELS
            )));
        }
        if !LoggingConfig::FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ValidationError::logging(format!(
                "unknown log format `{}` (expected one of {:?})",
                self.logging.format,
                LoggingConfig::FORMATS
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CODESCAN").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan.max_concurrent_units, 4);
        assert_eq!(config.scan.output_root, PathBuf::from("scan-output"));
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let mut config = Config::default();
        config.scan.max_concurrent_units = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_worker_path_is_rejected() {
        let mut config = Config::default();
        config.worker.worker_path = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
