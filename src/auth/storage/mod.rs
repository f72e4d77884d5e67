//! Persisted session state shared between processes.

mod backend;
mod error;
mod hub;

pub use backend::{FileStorageBackend, MemoryStorageBackend, StorageBackend};
pub use error::StorageError;
pub use hub::{EventOrigin, StorageEvent, StorageHandle, StorageHub, StorageSubscription};

/// Key holding the signed-in bearer token.
pub const TOKEN_KEY: &str = "github_pat";

/// Key holding the pending PKCE code verifier.
pub const CODE_VERIFIER_KEY: &str = "github_code_verifier";
