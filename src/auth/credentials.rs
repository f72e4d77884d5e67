//! Durable storage for the signed-in token.

use super::storage::{StorageError, StorageHandle, StorageSubscription, TOKEN_KEY};
use super::token::AccessToken;

/// A token change made by another participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialChange {
    /// A token was stored elsewhere.
    Stored(AccessToken),
    /// The token was removed elsewhere.
    Cleared,
}

/// Reads and writes the single persisted token.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    storage: StorageHandle,
}

impl CredentialStore {
    /// Wraps a storage handle.
    #[must_use]
    pub const fn new(storage: StorageHandle) -> Self {
        Self { storage }
    }

    /// Persists `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the token cannot be written.
    pub fn save(&self, token: &AccessToken) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token.expose())
    }

    /// Returns the persisted token, if any.
    ///
    /// A blank stored value is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when storage cannot be read.
    pub fn load(&self) -> Result<Option<AccessToken>, StorageError> {
        Ok(self
            .storage
            .get(TOKEN_KEY)?
            .and_then(|value| AccessToken::new(value).ok()))
    }

    /// Removes the persisted token.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when storage cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(TOKEN_KEY)
    }

    /// Subscribes to token changes made by other participants.
    #[must_use]
    pub fn subscribe(&self) -> CredentialChanges {
        CredentialChanges {
            inner: self.storage.subscribe(),
        }
    }
}

/// Stream of [`CredentialChange`] events.
#[derive(Debug)]
pub struct CredentialChanges {
    inner: StorageSubscription,
}

impl CredentialChanges {
    /// Waits for the next token change. Returns `None` when storage closes.
    pub async fn recv(&mut self) -> Option<CredentialChange> {
        loop {
            let event = self.inner.recv().await?;
            if event.key != TOKEN_KEY {
                continue;
            }
            return Some(
                event
                    .new_value
                    .and_then(|value| AccessToken::new(value).ok())
                    .map_or(CredentialChange::Cleared, CredentialChange::Stored),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::{fixture, rstest};

    use super::{CredentialChange, CredentialStore};
    use crate::auth::AccessToken;
    use crate::auth::storage::{MemoryStorageBackend, StorageHub};

    #[fixture]
    fn two_tabs() -> (CredentialStore, CredentialStore) {
        let hub = StorageHub::new(Arc::new(MemoryStorageBackend::new()));
        (
            CredentialStore::new(hub.open_handle()),
            CredentialStore::new(hub.open_handle()),
        )
    }

    #[rstest]
    fn save_load_clear(two_tabs: (CredentialStore, CredentialStore)) {
        let (first, second) = two_tabs;
        let token = AccessToken::new("ghp_saved").expect("token should be valid");

        first.save(&token).expect("save should succeed");
        assert_eq!(second.load().expect("load"), Some(token));

        second.clear().expect("clear should succeed");
        assert_eq!(first.load().expect("load"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn other_tabs_receive_changes(two_tabs: (CredentialStore, CredentialStore)) {
        let (first, second) = two_tabs;
        let mut changes = second.subscribe();
        let token = AccessToken::new("ghp_shared").expect("token should be valid");

        first.save(&token).expect("save should succeed");
        first.clear().expect("clear should succeed");

        assert_eq!(changes.recv().await, Some(CredentialChange::Stored(token)));
        assert_eq!(changes.recv().await, Some(CredentialChange::Cleared));
    }

    #[rstest]
    #[tokio::test]
    async fn unrelated_keys_are_ignored(two_tabs: (CredentialStore, CredentialStore)) {
        let (first, second) = two_tabs;
        let mut changes = second.subscribe();

        first
            .storage
            .set("github_code_verifier", "v")
            .expect("set should succeed");
        first.clear().expect("clear should succeed");

        assert_eq!(changes.recv().await, Some(CredentialChange::Cleared));
    }
}
