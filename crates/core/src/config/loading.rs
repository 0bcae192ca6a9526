//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, Environment, File};
use std::path::Path;

use super::{global_config_path, Config};

impl Config {
    /// Loads configuration from a TOML file with environment variable
    /// overrides.
    ///
    /// Environment variables are prefixed with `PRICESCOUT_` and use double
    /// underscores for nested values. For example:
    /// - `PRICESCOUT_DISCOVERY__MIN_CONFIDENCE=0.5`
    /// - `PRICESCOUT_REMOTE__DRIVE_ID=b!xyz`
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut builder = ConfigLib::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("PRICESCOUT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        let config: Config = config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a single file
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.pricescout/config.toml or custom --config path)
    /// 3. Environment variables (PRICESCOUT_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        Self::from_file(&path)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
            [discovery]
            min_confidence = 0.5
            deep_scan = true

            [batching]
            max_count = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.discovery.min_confidence, 0.5);
        assert!(config.discovery.deep_scan);
        assert_eq!(config.batching.max_count, 25);
        // untouched sections keep their defaults
        assert_eq!(config.download.worker_pool_size, 4);
        assert_eq!(config.batching.max_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.discovery.max_files, 10_000);
        assert_eq!(config.remote.source, "graph");
    }

    #[test]
    fn invalid_values_are_rejected_on_load() {
        let result = Config::from_toml_str(
            r#"
            [batching]
            max_count = 0
            "#,
        );
        assert!(result.is_err());
    }
}
