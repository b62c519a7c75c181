//! Configuration management for the library loader
//!
//! Handles configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::library::traits::LibraryError;

/// Library loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Foundational library loaded by bootstrap (None = no forced load)
    #[serde(default = "default_core_library")]
    pub core_library: Option<String>,

    /// Entry point member called by `start`
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "library_loader=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

fn default_core_library() -> Option<String> {
    Some("core".to_string())
}

fn default_entry_point() -> String {
    "main".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            core_library: default_core_library(),
            entry_point: default_entry_point(),
            logging: None,
        }
    }
}

impl LoaderConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LibraryError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LibraryError::InvalidConfig(format!("Failed to read config file: {}", e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, LibraryError> {
        let config: LoaderConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate required fields
    pub fn validate(&self) -> Result<(), LibraryError> {
        if self.entry_point.is_empty() {
            return Err(LibraryError::InvalidConfig(
                "Entry point cannot be empty".to_string(),
            ));
        }
        if matches!(self.core_library.as_deref(), Some("")) {
            return Err(LibraryError::InvalidConfig(
                "Core library name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
