//! Storage layer
//!
//! The ledger persists into a single slot of a key-value store. The whole
//! customer list is written as one JSON document under the storage key
//! after every mutation, and read back once when the ledger opens.
//!
//! # Backends
//!
//! - [`MemoryStore`] - in-process map, for tests and embedding
//! - [`FileStore`] - one `<key>.json` file per key, replaced atomically
//! - `RocksStore` - RocksDB, behind the `rocksdb` feature

use crate::{
    config::StorageBackend,
    error::{Error, Result},
    types::Customer,
    Config,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key the customer snapshot lives under
pub const DEFAULT_STORAGE_KEY: &str = "food-order-customers";

/// Key-value storage port
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-per-key store under a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open the store, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        tracing::info!(dir = %dir.display(), "Opened file store");

        Ok(Self { dir })
    }

    /// Directory holding the files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(Error::Storage(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");

        // Readers see either the old or the new snapshot
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(path = %path.display(), bytes = value.len(), "Snapshot written");
        Ok(())
    }
}

/// RocksDB-backed store
#[cfg(feature = "rocksdb")]
pub struct RocksStore {
    db: rocksdb::DB,
}

#[cfg(feature = "rocksdb")]
impl RocksStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;

        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);

        let db = rocksdb::DB::open(&opts, path)?;
        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db })
    }
}

#[cfg(feature = "rocksdb")]
impl fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksStore").field("path", &self.db.path()).finish()
    }
}

#[cfg(feature = "rocksdb")]
impl KeyValueStore for RocksStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| Error::Storage(format!("Value for {} is not UTF-8: {}", key, e))),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.db.put(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }
}

/// Open the backend selected by `config`
pub fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::File => Ok(Arc::new(FileStore::open(&config.data_dir)?)),
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => Ok(Arc::new(RocksStore::open(&config.data_dir)?)),
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => Err(Error::Config(
            "RocksDB backend requested but built without the `rocksdb` feature".to_string(),
        )),
    }
}

/// Encode a customer list as the stored JSON document
pub fn encode_snapshot(customers: &[Customer]) -> Result<String> {
    Ok(serde_json::to_string(customers)?)
}

/// Decode a stored JSON document
pub fn decode_snapshot(raw: &str) -> Result<Vec<Customer>> {
    Ok(serde_json::from_str(raw)?)
}

/// Customers read from the snapshot slot
#[derive(Debug, Default)]
pub struct LoadedSnapshot {
    /// Decoded customers; empty when absent or corrupt
    pub customers: Vec<Customer>,

    /// Stored text is not in canonical form (older layout, missing ids)
    pub needs_rewrite: bool,
}

/// The customer snapshot slot: one key in one store
#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStore").field("key", &self.key).finish()
    }
}

impl SnapshotStore {
    /// Snapshot slot under `key`
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Snapshot slot under the default key
    pub fn with_default_key(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, DEFAULT_STORAGE_KEY)
    }

    /// Storage key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored customer list
    ///
    /// Absent, unreadable and unparsable values all load as an empty list.
    pub fn load(&self) -> LoadedSnapshot {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(key = %self.key, "No stored snapshot, starting empty");
                return LoadedSnapshot::default();
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Snapshot unreadable, starting empty");
                return LoadedSnapshot::default();
            }
        };

        let customers = match decode_snapshot(&raw) {
            Ok(customers) => customers,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Snapshot corrupt, starting empty");
                return LoadedSnapshot::default();
            }
        };

        // ids or defaults filled in during decode only exist in memory until written back
        let needs_rewrite = encode_snapshot(&customers).map_or(true, |canonical| canonical != raw);
        tracing::info!(
            key = %self.key,
            customers = customers.len(),
            needs_rewrite,
            "Snapshot loaded"
        );

        LoadedSnapshot {
            customers,
            needs_rewrite,
        }
    }

    /// Replace the stored customer list
    pub fn save(&self, customers: &[Customer]) -> Result<()> {
        let raw = encode_snapshot(customers)?;
        self.store.put(&self.key, &raw)
    }
}
