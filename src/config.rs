use std::path::Path;

use crate::checkpoint::CheckpointManagerConfig;
use crate::error::ConfigError;
use crate::model::DeepSenseParams;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: DeepSenseParams,
    pub checkpoint: CheckpointManagerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            model: DeepSenseParams::default(),
            checkpoint: CheckpointManagerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!(
                "config file '{}' not found, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        if self.checkpoint.max_to_keep == 0 {
            return Err(ConfigError::Validation(
                "checkpoint.max_to_keep must be >= 1".into(),
            ));
        }
        if self.checkpoint.save_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "checkpoint.save_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}
