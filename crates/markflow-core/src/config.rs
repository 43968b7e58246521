//! Editor configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! `#[serde(default)]` on each struct fills missing fields from
//! `Default::default()`, so a config file only needs the settings it
//! changes:
//!
//! ```toml
//! [editor]
//! markdown_shortcuts = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::persistence::STORAGE_KEY;
use crate::trigger::TriggerEngine;

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Editing behavior
    pub editor: EditorConfig,

    /// Where documents are saved
    pub storage: StorageConfig,
}

impl Config {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from_default_path() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default config: {}", e);
                Self::default()
            }
        }
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("markflow").join("config.toml"))
    }
}

/// Editing behavior configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Convert `#`, `*`, `**` and `***` markers into formatting
    pub markdown_shortcuts: bool,
}

impl EditorConfig {
    /// Builds the trigger engine these settings describe.
    pub fn trigger_engine(&self) -> TriggerEngine {
        if self.markdown_shortcuts {
            TriggerEngine::new()
        } else {
            TriggerEngine::line_breaks_only()
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            markdown_shortcuts: true,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding saved documents (platform data dir if unset)
    pub directory: Option<PathBuf>,

    /// Identifier the document is saved under
    pub key: String,
}

impl StorageConfig {
    /// Returns the configured directory or the platform default.
    pub fn resolved_directory(&self) -> Result<PathBuf, ConfigError> {
        match &self.directory {
            Some(dir) => Ok(dir.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
                Ok(data_dir.join("markflow"))
            }
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: None,
            key: STORAGE_KEY.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Data directory not found")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
