//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod pipeline;
mod storage;

pub use pipeline::PipelineConfig;
pub use storage::StorageConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "SESSIONFLOW_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "SESSIONFLOW";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "SESSIONFLOW_LOG";

use serde::Deserialize;

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Reload pipeline configuration.
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, e.g.
    ///    `SESSIONFLOW__STORAGE__PATH`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("pipeline.discount_effect_types")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.storage.path, "data/sessionflow.db");
        assert_eq!(config.pipeline.discount_effect_types.len(), 2);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("failed to create temp file");
        writeln!(
            file,
            "storage:\n  path: /tmp/other.db\n  wal: false\npipeline:\n  discount_effect_types:\n    - loyaltyCredit\n"
        )
        .expect("failed to write config");

        let path = file.path().to_str().expect("non-utf8 temp path");
        let config = Config::load(Some(path)).expect("failed to load config");

        assert_eq!(config.storage.path, "/tmp/other.db");
        assert!(!config.storage.wal);
        assert_eq!(config.storage.max_connections, 4);
        assert_eq!(config.pipeline.discount_effect_types, vec!["loyaltyCredit".to_string()]);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Config::load(Some("/nonexistent/sessionflow.yaml")).is_err());
    }
}
