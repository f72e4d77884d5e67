//! OAuth PKCE (RFC 7636) authorization URL construction.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use url::Url;

use super::error::AuthError;
use super::storage::{CODE_VERIFIER_KEY, StorageError, StorageHandle};

/// Scopes requested from GitHub.
pub const OAUTH_SCOPES: &str = "repo read:user";

const VERIFIER_BYTES: usize = 32;

/// Settings shared by the initiator and the exchanger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthSettings {
    /// OAuth application client ID. `None` or blank disables OAuth sign-in.
    pub client_id: Option<String>,
    /// Provider authorization endpoint.
    pub authorize_url: Url,
    /// Where the provider sends the user back.
    pub redirect_uri: Url,
}

impl OAuthSettings {
    fn client_id(&self) -> Result<&str, AuthError> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::Configuration)
    }
}

/// Generates a code verifier: 32 random bytes, base64url without padding.
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut bytes = [0_u8; VERIFIER_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derives the S256 code challenge for `verifier`.
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Single-slot persisted store for the pending code verifier.
#[derive(Debug, Clone)]
pub struct PkceStash {
    storage: StorageHandle,
}

impl PkceStash {
    /// Wraps a storage handle.
    #[must_use]
    pub const fn new(storage: StorageHandle) -> Self {
        Self { storage }
    }

    /// Stores `verifier`, replacing any pending one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the verifier cannot be written.
    pub fn put(&self, verifier: &str) -> Result<(), StorageError> {
        self.storage.set(CODE_VERIFIER_KEY, verifier)
    }

    /// Removes and returns the pending verifier.
    ///
    /// The slot is emptied even when reading it yields nothing usable.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when storage cannot be accessed.
    pub fn take(&self) -> Result<Option<String>, StorageError> {
        let pending = self.storage.get(CODE_VERIFIER_KEY);
        self.storage.remove(CODE_VERIFIER_KEY)?;
        Ok(pending?.filter(|value| !value.trim().is_empty()))
    }
}

/// Builds authorization URLs for the PKCE flow.
#[derive(Debug, Clone)]
pub struct OAuthInitiator {
    settings: OAuthSettings,
    stash: PkceStash,
}

impl OAuthInitiator {
    /// Creates an initiator.
    #[must_use]
    pub const fn new(settings: OAuthSettings, stash: PkceStash) -> Self {
        Self { settings, stash }
    }

    /// Creates a fresh verifier, stashes it, and returns the provider URL
    /// the user must visit.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] when no client ID is set, or
    /// [`AuthError::Storage`] when the verifier cannot be persisted.
    pub fn build_authorization_url(&self) -> Result<Url, AuthError> {
        let client_id = self.settings.client_id()?;
        let verifier = generate_code_verifier();
        self.stash.put(&verifier)?;
        let challenge = code_challenge(&verifier);

        let mut url = self.settings.authorize_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", self.settings.redirect_uri.as_str())
            .append_pair("scope", OAUTH_SCOPES)
            .append_pair("response_type", "code")
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256");

        tracing::debug!(authorize_url = %self.settings.authorize_url, "built authorization URL");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use rstest::{fixture, rstest};
    use url::Url;

    use super::{OAuthInitiator, OAuthSettings, PkceStash, code_challenge, generate_code_verifier};
    use crate::auth::AuthError;
    use crate::auth::storage::{MemoryStorageBackend, StorageHub};

    fn settings(client_id: Option<&str>) -> OAuthSettings {
        OAuthSettings {
            client_id: client_id.map(ToOwned::to_owned),
            authorize_url: Url::parse("https://github.com/login/oauth/authorize")
                .expect("static URL"),
            redirect_uri: Url::parse("http://127.0.0.1:8976/").expect("static URL"),
        }
    }

    #[fixture]
    fn stash() -> PkceStash {
        PkceStash::new(StorageHub::new(Arc::new(MemoryStorageBackend::new())).open_handle())
    }

    #[rstest]
    fn verifier_is_43_url_safe_characters() {
        let verifier = generate_code_verifier();
        assert_eq!(verifier.len(), 43);
        assert!(
            verifier
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        );
        assert_ne!(verifier, generate_code_verifier());
    }

    #[rstest]
    fn challenge_matches_rfc_7636_example() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mJ92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[rstest]
    fn authorization_url_carries_pkce_parameters(stash: PkceStash) {
        let initiator = OAuthInitiator::new(settings(Some("Iv1.client")), stash.clone());

        let url = initiator
            .build_authorization_url()
            .expect("URL should build");
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let verifier = stash
            .take()
            .expect("stash readable")
            .expect("verifier stashed");

        assert_eq!(url.host_str(), Some("github.com"));
        assert_eq!(url.path(), "/login/oauth/authorize");
        assert_eq!(query.get("client_id").map(String::as_str), Some("Iv1.client"));
        assert_eq!(
            query.get("redirect_uri").map(String::as_str),
            Some("http://127.0.0.1:8976/")
        );
        assert_eq!(query.get("scope").map(String::as_str), Some("repo read:user"));
        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(
            query.get("code_challenge_method").map(String::as_str),
            Some("S256")
        );
        assert_eq!(
            query.get("code_challenge"),
            Some(&code_challenge(&verifier))
        );
    }

    #[rstest]
    fn new_flow_overwrites_pending_verifier(stash: PkceStash) {
        let initiator = OAuthInitiator::new(settings(Some("Iv1.client")), stash.clone());

        let first = initiator.build_authorization_url().expect("URL should build");
        let second = initiator.build_authorization_url().expect("URL should build");
        let verifier = stash
            .take()
            .expect("stash readable")
            .expect("verifier stashed");

        let challenge_of = |url: &Url| {
            url.query_pairs()
                .find(|(name, _)| name == "code_challenge")
                .map(|(_, value)| value.into_owned())
        };
        assert_ne!(challenge_of(&first), challenge_of(&second));
        assert_eq!(challenge_of(&second), Some(code_challenge(&verifier)));
    }

    #[rstest]
    #[case::missing(None)]
    #[case::blank(Some("  "))]
    fn missing_client_id_is_a_configuration_error(
        stash: PkceStash,
        #[case] client_id: Option<&str>,
    ) {
        let initiator = OAuthInitiator::new(settings(client_id), stash.clone());

        assert_eq!(
            initiator.build_authorization_url(),
            Err(AuthError::Configuration)
        );
        assert_eq!(stash.take().expect("stash readable"), None);
    }

    #[rstest]
    fn take_empties_the_slot(stash: PkceStash) {
        stash.put("pending").expect("put should succeed");

        assert_eq!(stash.take().expect("take"), Some("pending".to_owned()));
        assert_eq!(stash.take().expect("take"), None);
    }
}
