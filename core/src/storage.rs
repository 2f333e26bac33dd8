//! Key/value storage behind a narrow adapter trait.
//!
//! Everything the pipeline persists (session token, cached profile,
//! UI preferences) goes through [`Storage`]. Values are stored as JSON
//! text, so any serde-compatible type round-trips and a hand-edited
//! or stale entry degrades to the caller's fallback instead of an error.
//!
//! Two backends are provided: [`MemoryStorage`] for tests and ephemeral
//! sessions, and [`JsonFileStorage`] persisting to a single JSON file.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A value could not be serialized to JSON before writing.
    #[error("failed to serialize value for key '{key}': {source}")]
    Serialize {
        /// The key the value was being written under.
        key: String,
        /// The underlying serialization error.
        source: serde_json::Error,
    },

    /// The backing file could not be read or written.
    #[error("failed to access storage file {path:?}: {source}")]
    Io {
        /// The file the backend persists to.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The backing file exists but does not contain the expected JSON shape.
    #[error("storage file {path:?} contains invalid JSON: {source}")]
    Corrupt {
        /// The file the backend persists to.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// The backing file's contents could not be encoded for writing.
    #[error("failed to encode storage file {path:?}: {source}")]
    Encode {
        /// The file the backend persists to.
        path: PathBuf,
        /// The underlying serialization error.
        source: serde_json::Error,
    },
}

/// Adapter over a string key/value store with typed JSON accessors.
///
/// `get_raw`/`put_raw`/`remove` are the backend surface; the typed
/// `load`/`load_or`/`save` helpers are provided on top and never need
/// reimplementing.
pub trait Storage: Send + Sync {
    /// Read the raw stored text for `key`, if present.
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Write raw text under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot persist the write.
    fn put_raw(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Remove `key` and its value. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot persist the removal.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Load and deserialize the value stored under `key`.
    ///
    /// Returns `None` when the key is absent or the stored text does not
    /// parse as `T`. A parse failure is logged, never propagated: stale
    /// or tampered entries must not take the application down.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, %error, "stored value failed to parse, ignoring it");
                None
            }
        }
    }

    /// Load the value stored under `key`, or `default` when absent or unparsable.
    fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.load(key).unwrap_or(default)
    }

    /// Serialize `value` to JSON and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization fails or the backend cannot
    /// persist the write.
    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: key.to_owned(),
            source,
        })?;
        self.put_raw(key, raw)
    }
}

/// In-memory storage backed by a shared map.
///
/// Clones share the same underlying map, mirroring how a browser tab
/// shares one `localStorage`. Writes never fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put_raw(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// File-backed storage persisting all entries to one JSON document.
///
/// The whole document is rewritten on every mutation, which keeps the
/// on-disk format trivially inspectable. Entries are kept sorted so
/// successive writes of the same state produce identical files.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: Arc<PathBuf>,
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl JsonFileStorage {
    /// Open (or create) a store backed by the file at `path`.
    ///
    /// A missing file starts the store empty; it is created on first write.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read, or when
    /// its contents are not a JSON object of string values.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| {
                StorageError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        Ok(Self {
            path: Arc::new(path),
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    /// The file this store persists to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let contents =
            serde_json::to_string_pretty(entries).map_err(|source| StorageError::Encode {
                path: self.path.as_ref().clone(),
                source,
            })?;
        std::fs::write(self.path.as_ref(), contents).map_err(|source| StorageError::Io {
            path: self.path.as_ref().clone(),
            source,
        })
    }
}

impl Storage for JsonFileStorage {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put_raw(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value);
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            return self.persist(&entries);
        }
        Ok(())
    }
}
