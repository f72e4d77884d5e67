//! Top-level error type surfaced by the command-line interface.

use thiserror::Error;

use crate::auth::{AuthError, StorageError};
use crate::review::ReviewError;

/// Errors returned by the binary's operation modes.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {message}")]
    Configuration {
        /// Detailed description of the problem.
        message: String,
    },

    /// Reviewing a pull request failed.
    #[error(transparent)]
    Review(#[from] ReviewError),

    /// Authentication or session management failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Persisted state could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Writing output failed.
    #[error("I/O error: {message}")]
    Io {
        /// Detailed description of the I/O failure.
        message: String,
    },
}

impl AppError {
    /// Builds a configuration error from any displayable message.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
