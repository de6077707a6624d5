//! Configuration loading and defaults for remote-lockd.

use crate::domain::SuppressionStrategy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for remote-lockd.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Suppression strategy selected at startup
    /// (default: timeout-reaffirmation).
    pub default_strategy: SuppressionStrategy,

    /// Dry run mode: log suppression actions instead of performing them.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_strategy: SuppressionStrategy::TimeoutReaffirmation,
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from the default path, or return defaults if not found.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load(p);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let default_path = config_dir.join("remote-lockd").join("config.toml");
            if default_path.exists() {
                return Self::load(&default_path);
            }
        }

        Ok(Self::default())
    }
}
