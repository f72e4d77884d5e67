//! Key-value backends for persisted session state.

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

use super::error::StorageError;

/// Synchronous string key-value storage.
///
/// Absence of a key is represented as `Ok(None)`, never as an error.
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One file per key inside a state directory.
///
/// Writes go through a temporary file and a rename so a concurrent reader
/// in another process sees either the old or the new value.
pub struct FileStorageBackend {
    root: Utf8PathBuf,
    dir: Dir,
}

impl fmt::Debug for FileStorageBackend {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FileStorageBackend")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FileStorageBackend {
    /// Opens (creating if needed) the state directory at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] when the directory cannot be
    /// created or opened.
    pub fn open(root: &Utf8Path) -> Result<Self, StorageError> {
        Dir::create_ambient_dir_all(root, ambient_authority()).map_err(|error| {
            StorageError::Unavailable {
                message: format!("failed to create state directory '{root}': {error}"),
            }
        })?;
        let dir = Dir::open_ambient_dir(root, ambient_authority()).map_err(|error| {
            StorageError::Unavailable {
                message: format!("failed to open state directory '{root}': {error}"),
            }
        })?;
        Ok(Self {
            root: root.to_owned(),
            dir,
        })
    }

    /// Directory holding the state files.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl StorageBackend for FileStorageBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.dir.read_to_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(StorageError::io("read", key, &error)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let staging = format!(".{key}.{}.tmp", std::process::id());
        self.dir
            .write(&staging, value)
            .map_err(|error| StorageError::io("write", key, &error))?;
        self.dir
            .rename(&staging, &self.dir, key)
            .map_err(|error| StorageError::io("write", key, &error))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.dir.remove_file(key) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(StorageError::io("remove", key, &error)),
        }
    }
}

/// In-process backend used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorageBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorageBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
        operation: &'static str,
        key: &str,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::Io {
            operation,
            key: key.to_owned(),
            message: "memory storage lock poisoned".to_owned(),
        })
    }
}

impl StorageBackend for MemoryStorageBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock("read", key)?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock("write", key)?
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock("remove", key)?.remove(key);
        Ok(())
    }
}
