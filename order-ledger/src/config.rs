//! Configuration for the order ledger

use crate::{catalog::Catalog, storage::DEFAULT_STORAGE_KEY, types::MenuItem, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for file and RocksDB backends
    pub data_dir: PathBuf,

    /// Key the customer snapshot is stored under
    pub storage_key: String,

    /// Storage backend
    pub backend: StorageBackend,

    /// Symbol printed in front of amounts
    pub currency_symbol: String,

    /// Default log filter directive
    pub log_level: String,

    /// Replacement menu; the built-in one is used when absent
    pub menu: Option<Vec<MenuItem>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/order-ledger"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            backend: StorageBackend::File,
            currency_symbol: "₹".to_string(),
            log_level: "info".to_string(),
            menu: None,
        }
    }
}

/// Key-value backend holding the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per key under `data_dir`
    File,
    /// Process memory only; nothing survives exit
    Memory,
    /// RocksDB database under `data_dir` (needs the `rocksdb` feature)
    Rocksdb,
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "memory" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::Rocksdb),
            other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        Config::default().with_env_overrides()
    }

    /// Apply `ORDER_LEDGER_*` environment variables on top of this config
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(data_dir) = std::env::var("ORDER_LEDGER_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(key) = std::env::var("ORDER_LEDGER_STORAGE_KEY") {
            self.storage_key = key;
        }

        if let Ok(backend) = std::env::var("ORDER_LEDGER_BACKEND") {
            self.backend = backend.parse()?;
        }

        if let Ok(level) = std::env::var("ORDER_LEDGER_LOG") {
            self.log_level = level;
        }

        Ok(self)
    }

    /// Catalog for this configuration
    pub fn catalog(&self) -> Result<Catalog> {
        match &self.menu {
            Some(items) => Catalog::new(items.clone()),
            None => Ok(Catalog::builtin()),
        }
    }
}
