//! # Configuration File
//!
//! Optional TOML configuration. Command-line flags win over the file; the
//! file wins over built-in defaults.
//!
//! ```toml
//! [storage]
//! database = "recorder.db"
//! backend = "redb"
//! seed = "blueprint.json"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```

use recorder_core::RecorderError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[storage]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the settings database.
    pub database: Option<PathBuf>,
    /// `redb` or `memory`.
    pub backend: Option<String>,
    /// Seed blueprint file.
    pub seed: Option<PathBuf>,
}

/// `[server]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self, RecorderError> {
        toml::from_str(text).map_err(|e| RecorderError::DeserializationError(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, RecorderError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RecorderError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::parse(&text)
    }
}
