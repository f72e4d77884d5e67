//! Error taxonomy for GitHub authentication.

use thiserror::Error;

use super::storage::StorageError;

/// Errors surfaced by sign-in, sign-out and session restoration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// OAuth sign-in is not configured. Token sign-in still works.
    #[error(
        "GitHub client ID is not configured; set github_client_id or \
         DIFFSCOPE_GITHUB_CLIENT_ID, or sign in with --token instead"
    )]
    Configuration,

    /// The token exchange service answered with a non-success status.
    #[error("GitHub authentication failed; the token exchange service responded with {status}")]
    ExchangeFailed {
        /// HTTP status returned by the exchange service.
        status: u16,
    },

    /// The token exchange succeeded without returning a token.
    #[error("access token not found in the token exchange response; try signing in again")]
    MalformedResponse,

    /// No stashed code verifier was found for the callback.
    #[error("code verifier missing; the sign-in session may have expired")]
    SessionExpired,

    /// GitHub did not accept the token.
    #[error("verification failed; check your token and its permissions")]
    TokenRejected,

    /// A blank token was supplied.
    #[error("a GitHub token is required")]
    MissingToken,

    /// The authorization server redirected back with an error.
    #[error("GitHub sign-in was not completed: {message}")]
    Callback {
        /// Error detail from the redirect.
        message: String,
    },

    /// Networking failed while talking to an authentication service.
    #[error("network error during sign-in: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// Persisted session state could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A newer session change overtook this operation.
    #[error("the session changed while signing in; the newer change was kept")]
    Superseded,
}
