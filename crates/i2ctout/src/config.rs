//! Configuration management for i2ctout.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "i2ctout";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `I2CTOUT_`)
/// 2. TOML config file at `~/.config/i2ctout/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Memory device configuration.
    pub device: DeviceConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

/// Memory device configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device exposing physical memory.
    pub path: PathBuf,
}

/// Output configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print the result as JSON instead of a plain line.
    pub json: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(i2ctout_linux::MEM_DEVICE_PATH),
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `I2CTOUT_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(Self::figment(&config_file))
    }

    fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("I2CTOUT_").split("_"))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.device.path.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "device.path must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.device.path, PathBuf::from("/dev/mem"));
        assert!(!config.output.json);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_device_path() {
        let mut config = Config::default();
        config.device.path = PathBuf::new();

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("device.path"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("i2ctout"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .expect("defaults should load");
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [device]
                path = "/dev/periphmem"

                [output]
                json = true
                "#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .expect("config should load");
            assert_eq!(config.device.path, PathBuf::from("/dev/periphmem"));
            assert!(config.output.json);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[device]\npath = \"/dev/periphmem\"\n")?;
            jail.set_env("I2CTOUT_DEVICE_PATH", "/dev/fake");

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .expect("config should load");
            assert_eq!(config.device.path, PathBuf::from("/dev/fake"));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_empty_device_path() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[device]\npath = \"\"\n")?;

            let result = Config::load_from(Some(PathBuf::from("config.toml")));
            assert!(matches!(result, Err(Error::ConfigValidation { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("/dev/mem"));
        assert!(json.contains("json"));
    }

    #[test]
    fn test_output_config_deserialize() {
        let json = r#"{"json": true}"#;
        let output: OutputConfig = serde_json::from_str(json).unwrap();
        assert!(output.json);
    }
}
