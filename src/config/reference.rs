//! Reference data loading from config.toml
//!
//! Categories and units are flat lookup tables. The names listed in config.toml are
//! inserted on startup when missing; existing rows are left alone.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Categories to seed
    #[serde(default)]
    pub categories: Vec<NamedEntry>,
    /// Units to seed
    #[serde(default)]
    pub units: Vec<NamedEntry>,
}

/// One `[[categories]]` or `[[units]]` table
#[derive(Debug, Deserialize, Clone)]
pub struct NamedEntry {
    /// Display name
    pub name: String,
}

/// Loads reference data configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads ./config.toml, or an empty configuration when the file does not exist.
pub fn load_default_config() -> Result<Config> {
    let path = Path::new("config.toml");
    if !path.exists() {
        tracing::warn!("config.toml not found; no reference data will be seeded");
        return Ok(Config::default());
    }
    load_config(path)
}
