//! Application configuration loading from config.toml
//!
//! The file is optional; every field has a default. `QURBAN_CONFIG` points at
//! an alternative path.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Target threshold used until an administrator stores one.
pub const DEFAULT_TARGET: Decimal = Decimal::from_parts(3_600_000, 0, 0, false, 0);

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Database URL, overridden by `DATABASE_URL`
    pub database_url: Option<String>,
    /// Target threshold seeded into the settings table when absent
    pub default_target: Decimal,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            default_target: DEFAULT_TARGET,
        }
    }
}

impl AppConfig {
    fn validate(self) -> Result<Self> {
        if self.default_target <= Decimal::ZERO {
            return Err(Error::Config {
                message: format!(
                    "default_target must be greater than zero, got {}",
                    self.default_target
                ),
            });
        }
        Ok(self)
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()
}

/// Loads configuration from `path`. A missing file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No configuration file at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }
    debug!("Loading configuration from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path:?}: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads configuration from `QURBAN_CONFIG` or `./config.toml`.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("QURBAN_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}
