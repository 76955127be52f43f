//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::display::ApplyMethod;
use crate::model::ModelOptions;

/// Where to find the DisplayConfig service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbusConfig {
    /// Bus name (default "org.gnome.Mutter.DisplayConfig")
    pub destination: String,

    /// Object path (default "/org/gnome/Mutter/DisplayConfig")
    pub path: String,
}

/// How changes are sent to the compositor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyConfig {
    /// "temporary" or "persistent"
    pub method: ApplyMethod,
}

/// Presentation model options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Also present monitors with a single mode
    pub include_fixed_monitors: bool,

    /// Offer underscan variants on monitors that support it
    pub offer_underscan: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let options = ModelOptions::default();
        Self {
            include_fixed_monitors: options.include_fixed_monitors,
            offer_underscan: options.offer_underscan,
        }
    }
}

impl From<&ModelConfig> for ModelOptions {
    fn from(config: &ModelConfig) -> Self {
        Self {
            include_fixed_monitors: config.include_fixed_monitors,
            offer_underscan: config.offer_underscan,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Directory for log files (None = console only)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}
