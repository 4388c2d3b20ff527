//! Persistent key/value storage for the command-line tool.
//!
//! A single trait `StorageBackend` with a file-backed implementation:
//!
//! - `FileStorage` stores one JSON file holding a map of string keys to string values. The file
//!   lives in a per-user configuration directory and is read and written synchronously.
//!
//! Structured values go through `save_json_backend`/`load_json_backend`, which serialize with
//! `serde_json` on top of the string primitives.

use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Storage lock poisoned: {0}")]
    Lock(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Simple generic storage backend trait.
///
/// Keys and values are UTF-8 strings.
pub trait StorageBackend: Send + Sync {
    /// Store a string value for a key.
    fn set_string(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Read a string value for a key. Returns Ok(None) when key is missing.
    fn get_string(&self, key: &str) -> StorageResult<Option<String>>;

    /// Remove a key (no-op if key does not exist).
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// All stored keys, in no particular order.
    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Serialize `value` and store it under `key`.
///
/// Free function so the trait stays object-safe.
pub fn save_json_backend<T: Serialize>(
    backend: &dyn StorageBackend,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    match serde_json::to_string(value) {
        Ok(s) => backend.set_string(key, &s),
        Err(e) => Err(StorageError::Json(e.to_string())),
    }
}

pub fn load_json_backend<T: DeserializeOwned>(
    backend: &dyn StorageBackend,
    key: &str,
) -> StorageResult<Option<T>> {
    match backend.get_string(key)? {
        Some(s) => match serde_json::from_str::<T>(&s) {
            Ok(v) => Ok(Some(v)),
            Err(e) => Err(StorageError::Json(e.to_string())),
        },
        None => Ok(None),
    }
}

/// File-based storage: a single JSON file which is a map of key -> string value.
///
/// - On init, the file is read into memory.
/// - Mutations update memory and flush the file back to disk synchronously.
pub struct FileStorage {
    path: PathBuf,
    inner: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Default storage file for the current user:
    /// - On Windows: %APPDATA%/Marble/storage.json
    /// - Else: $HOME/.config/marble/storage.json
    pub fn default_storage_path() -> PathBuf {
        if cfg!(windows)
            && let Ok(appdata) = std::env::var("APPDATA")
        {
            return Path::new(&appdata).join("Marble").join("storage.json");
        }

        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home)
                .join(".config")
                .join("marble")
                .join("storage.json");
        }

        Path::new(".").join("marble-storage.json")
    }

    pub fn new_with_path(path: Option<PathBuf>) -> StorageResult<Self> {
        let path = path.unwrap_or_else(Self::default_storage_path);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            return Err(StorageError::Io(format!(
                "Failed to create storage parent directory: {}",
                e
            )));
        }

        let mut map: HashMap<String, String> = HashMap::new();
        if path.exists() {
            let s = fs::read_to_string(&path)
                .map_err(|e| StorageError::Io(format!("Failed to read storage file: {}", e)))?;
            if !s.trim().is_empty() {
                map = serde_json::from_str::<HashMap<String, String>>(&s).map_err(|e| {
                    StorageError::Json(format!("Failed to parse storage JSON: {}", e))
                })?;
            }
        }
        tracing::debug!(path = %path.display(), keys = map.len(), "Opened storage");

        Ok(FileStorage {
            path,
            inner: Mutex::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush_locked(&self, locked: &HashMap<String, String>) -> StorageResult<()> {
        let s =
            serde_json::to_string_pretty(locked).map_err(|e| StorageError::Json(e.to_string()))?;
        fs::write(&self.path, s).map_err(|e| StorageError::Io(format!("write failed: {}", e)))
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl StorageBackend for FileStorage {
    fn set_string(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut guard = self.lock()?;
        guard.insert(key.to_string(), value.to_string());
        self.flush_locked(&guard)
    }

    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = self.lock()?;
        if guard.remove(key).is_some() {
            self.flush_locked(&guard)?;
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

/// Open the storage file, falling back to the per-user default location.
pub fn default_storage_backend(path: Option<PathBuf>) -> StorageResult<Box<dyn StorageBackend>> {
    Ok(Box::new(FileStorage::new_with_path(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, serde::Deserialize, Debug, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        {
            let storage = FileStorage::new_with_path(Some(path.clone())).unwrap();
            storage.set_string("a", "1").unwrap();
            storage.set_string("b", "2").unwrap();
            storage.remove("a").unwrap();
        }
        let storage = FileStorage::new_with_path(Some(path)).unwrap();
        assert_eq!(storage.get_string("a").unwrap(), None);
        assert_eq!(storage.get_string("b").unwrap().as_deref(), Some("2"));
        assert_eq!(storage.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_json_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let backend = default_storage_backend(Some(dir.path().join("s.json"))).unwrap();
        let value = Sample {
            name: "tracks".into(),
            count: 3,
        };
        save_json_backend(backend.as_ref(), "sample", &value).unwrap();
        let loaded: Option<Sample> = load_json_backend(backend.as_ref(), "sample").unwrap();
        assert_eq!(loaded, Some(value));
        let missing: Option<Sample> = load_json_backend(backend.as_ref(), "missing").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FileStorage::new_with_path(Some(path)),
            Err(StorageError::Json(_))
        ));
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new_with_path(Some(dir.path().join("s.json"))).unwrap();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = storage.inner.lock().unwrap();
            panic!("writer died");
        }));
        assert!(matches!(storage.get_string("a"), Err(StorageError::Lock(_))));
        assert!(matches!(storage.set_string("a", "1"), Err(StorageError::Lock(_))));
    }

    #[test]
    fn test_mismatched_json_type() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new_with_path(Some(dir.path().join("s.json"))).unwrap();
        storage.set_string("sample", "[1, 2]").unwrap();
        let loaded: StorageResult<Option<Sample>> = load_json_backend(&storage, "sample");
        assert!(matches!(loaded, Err(StorageError::Json(_))));
    }
}
