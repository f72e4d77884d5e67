//! Storage failures.

use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// An I/O operation on a key failed.
    #[error("failed to {operation} session state '{key}': {message}")]
    Io {
        /// The attempted operation (`read`, `write` or `remove`).
        operation: &'static str,
        /// Storage key involved.
        key: String,
        /// Error detail.
        message: String,
    },

    /// The storage location could not be opened.
    #[error("session storage is unavailable: {message}")]
    Unavailable {
        /// Error detail.
        message: String,
    },
}

impl StorageError {
    pub(crate) fn io(operation: &'static str, key: &str, error: &std::io::Error) -> Self {
        Self::Io {
            operation,
            key: key.to_owned(),
            message: error.to_string(),
        }
    }
}
