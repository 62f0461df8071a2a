//! Context configuration

use crate::statement::Consistency;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(String),
}

/// Configuration for a [`crate::Context`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonnadeConfig {
    /// Keyspace the driver is bound to (informational; used in logs)
    #[serde(default)]
    pub keyspace: Option<String>,

    /// Applied to statements that do not set a consistency level
    #[serde(default)]
    pub default_consistency: Option<Consistency>,

    /// Log every statement at debug level
    #[serde(default)]
    pub debug_queries: bool,

    #[serde(default)]
    pub sync: SyncConfig,
}

/// `[sync]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Run table synchronization at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Report live columns that no schema declares
    #[serde(default = "default_true")]
    pub warn_extra_columns: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            warn_extra_columns: default_true(),
        }
    }
}

impl Default for ColonnadeConfig {
    fn default() -> Self {
        Self {
            keyspace: None,
            default_consistency: None,
            debug_queries: false,
            sync: SyncConfig::default(),
        }
    }
}

impl ColonnadeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
