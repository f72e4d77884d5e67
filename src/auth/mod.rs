//! GitHub authentication: tokens, persisted credentials, OAuth PKCE and the
//! session state machine.

pub mod callback;
mod credentials;
mod error;
mod exchange;
mod pkce;
mod session;
pub mod storage;
mod token;
mod verifier;

pub use callback::{CallbackServer, OAuthCallback, ParsedRedirect, PendingCallback, SignInOutcome};
pub use credentials::{CredentialChange, CredentialChanges, CredentialStore};
pub use error::AuthError;
pub use exchange::{BackendTokenExchanger, TokenExchanger};
pub use pkce::{
    OAUTH_SCOPES, OAuthInitiator, OAuthSettings, PkceStash, code_challenge, generate_code_verifier,
};
pub use session::{AuthReason, PendingVerification, Session, SessionController, SessionNotice};
pub use storage::{StorageError, StorageHub};
pub use token::AccessToken;
pub use verifier::{GitHubTokenVerifier, TokenVerifier, Verification};

#[cfg(test)]
pub use exchange::MockTokenExchanger;
#[cfg(test)]
pub use verifier::MockTokenVerifier;
