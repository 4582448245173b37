//! Store configuration
//!
//! Loadable from TOML; every field has a default so an empty document is a
//! valid (in-memory) configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{config_error, Result};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_POOL_SIZE: usize = 4;

/// Configuration for opening a SQLite-backed store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Database file; `None` opens a private in-memory database
    pub path: Option<PathBuf>,
    /// Upper bound on how long a storage call waits for a competing writer
    pub busy_timeout_ms: u64,
    /// Idle connections kept for reuse (file databases only)
    pub pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl StoreConfig {
    /// In-memory configuration with defaults
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed configuration with defaults
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` on malformed TOML or unknown keys.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| config_error(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(config_error("pool_size must be at least 1"));
        }
        Ok(())
    }
}
