//! Client-side state persistence
//!
//! Keyed text blobs holding JSON, the terminal counterpart of browser local
//! storage. The persisted copy mirrors in-memory state and is never the
//! source of truth: read failures fall back to defaults and write failures
//! are logged and swallowed by callers.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Key of the persisted experiment form
pub const FORM_KEY: &str = "experimentFormData";

/// Key of the persisted chat transcript
pub const TRANSCRIPT_KEY: &str = "chatHistory";

/// Persistence failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt value for '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Keyed blob storage
pub trait Storage: Send + Sync {
    /// Read the blob for `key`; `Ok(None)` when nothing is stored
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the blob for `key`
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the blob for `key`; removing a missing key succeeds
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One JSON file per key inside a state directory
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        debug!(?dir, "FileStorage::open: called");
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        debug!(?path, "FileStorage::read: called");
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        debug!(?path, len = value.len(), "FileStorage::write: called");
        // Write-then-rename; readers never observe a partial blob
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|source| StorageError::Io {
                key: key.to_string(),
                source,
            })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        debug!(?path, "FileStorage::remove: called");
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Process-local storage, lost on exit
#[derive(Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.remove(key);
        Ok(())
    }
}

/// Read and decode the value stored under `key`
///
/// Distinguishes "nothing stored" (`Ok(None)`) from unreadable or corrupt
/// content (`Err`).
pub fn try_load_json<T: DeserializeOwned>(store: &dyn Storage, key: &str) -> Result<Option<T>, StorageError> {
    match store.read(key)? {
        Some(content) => serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Load the value under `key`, treating any storage failure as absent
pub fn load_json<T: DeserializeOwned + Default>(store: &dyn Storage, key: &str) -> T {
    debug!(%key, "load_json: called");
    match try_load_json(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => {
            debug!(%key, "load_json: nothing stored, using default");
            T::default()
        }
        Err(e) => {
            warn!(%key, error = %e, "load_json: unreadable persisted state, using default");
            T::default()
        }
    }
}

/// Encode and store `value` under `key`
pub fn save_json<T: Serialize>(store: &dyn Storage, key: &str, value: &T) -> Result<(), StorageError> {
    debug!(%key, "save_json: called");
    let content = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.write(key, &content)
}
