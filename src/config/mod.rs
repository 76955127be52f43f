//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - CLI arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod types;

use crate::display::ApplyMethod;
use crate::model::ModelOptions;
use crate::mutter::{DISPLAY_CONFIG_PATH, DISPLAY_CONFIG_SERVICE};

pub use types::{ApplyConfig, DbusConfig, LoggingConfig, ModelConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// D-Bus service location
    pub dbus: DbusConfig,
    /// Apply behaviour
    pub apply: ApplyConfig,
    /// Presentation model options
    #[serde(default)]
    pub model: ModelConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/refresh-switch/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("refresh-switch").join("config.toml"))
    }

    /// Create default configuration
    pub fn default_config() -> Result<Self> {
        Ok(Config {
            dbus: DbusConfig {
                destination: DISPLAY_CONFIG_SERVICE.to_string(),
                path: DISPLAY_CONFIG_PATH.to_string(),
            },
            apply: ApplyConfig {
                method: ApplyMethod::Temporary,
            },
            model: ModelConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                log_dir: None,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.dbus.destination.trim().is_empty() {
            anyhow::bail!("D-Bus destination must not be empty");
        }
        if !self.dbus.path.starts_with('/') {
            anyhow::bail!("Invalid D-Bus object path: {:?}", self.dbus.path);
        }

        // Verify only checks a configuration, it never applies one
        if self.apply.method == ApplyMethod::Verify {
            anyhow::bail!("Invalid apply method: verify (use \"temporary\" or \"persistent\")");
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(mut self, persistent: bool, include_fixed_monitors: bool) -> Self {
        if persistent {
            self.apply.method = ApplyMethod::Persistent;
        }
        if include_fixed_monitors {
            self.model.include_fixed_monitors = true;
        }

        self
    }

    /// Options for building presentation models
    pub fn model_options(&self) -> ModelOptions {
        ModelOptions::from(&self.model)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config().expect("Failed to create default config")
    }
}
