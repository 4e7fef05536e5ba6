//! Persistent configuration for dllmcp.
//!
//! Loads/saves a TOML config at `~/.dllmcp/config.toml`.

use crate::DllMcpError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level dllmcp configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DllMcpConfig {
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub indexing: IndexingConfig,
}

impl DllMcpConfig {
    /// Load configuration from the given path.
    pub fn load(path: &Path) -> Result<Self, DllMcpError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DllMcpError::Config(e.to_string()))
    }

    /// Save configuration to the given path.
    pub fn save(&self, path: &Path) -> Result<(), DllMcpError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| DllMcpError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default path, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Default config path: `~/.dllmcp/config.toml`.
    pub fn default_path() -> PathBuf {
        home_dir().join("config.toml")
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dllmcp")
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the catalog database file.
    pub db_path: String,
    /// SQLite cache size in MB.
    pub cache_size_mb: u32,
    /// SQLite busy timeout in seconds.
    pub busy_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: home_dir()
                .join("catalog.db")
                .to_string_lossy()
                .into_owned(),
            cache_size_mb: 64,
            busy_timeout_secs: 5,
        }
    }
}

/// Query defaults for catalog listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub default_page_size: u32,
    /// Requests above this are rejected.
    pub max_page_size: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 500,
        }
    }
}

impl CatalogConfig {
    /// Requested page size, or the default. A request above
    /// `max_page_size` is an `InvalidRequest`; zero is left for
    /// `TypeQuery::validate` to reject.
    pub fn page_size(&self, requested: Option<u32>) -> Result<u32, DllMcpError> {
        match requested {
            Some(size) if size > self.max_page_size => Err(DllMcpError::InvalidRequest(format!(
                "page_size must be <= {} (got {size})",
                self.max_page_size
            ))),
            Some(size) => Ok(size),
            None => Ok(self.default_page_size.min(self.max_page_size)),
        }
    }
}

/// Indexing behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Abort indexing when the sidecar documentation file is malformed,
    /// instead of indexing without documentation.
    pub strict_documentation: bool,
}
