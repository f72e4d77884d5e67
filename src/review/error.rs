//! Error taxonomy for the pull request review flow.

use thiserror::Error;

use crate::github::LocatorError;

/// Errors surfaced while requesting a pull request review.
///
/// Every variant is shown to the user verbatim and leaves the request
/// retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReviewError {
    /// The input was not a pull request URL. No network call was made.
    #[error("please enter a valid GitHub pull request URL ({0})")]
    InvalidInput(#[from] LocatorError),

    /// GitHub answered 404: the pull request is missing or private.
    #[error(
        "could not find the pull request; if it is in a private repository, \
         sign in with a GitHub token that can read it (status {status})"
    )]
    NotFoundOrPrivate {
        /// HTTP status returned by GitHub.
        status: u16,
    },

    /// GitHub rejected the supplied credentials.
    #[error(
        "GitHub authorization failed; your token may be invalid or lack 'repo' \
         permissions (status {status}): {message}"
    )]
    AuthorizationFailed {
        /// HTTP status returned by GitHub.
        status: u16,
        /// GitHub error message.
        message: String,
    },

    /// GitHub returned another non-success response.
    #[error("failed to fetch pull request data from GitHub{}: {message}", status_suffix(.status))]
    UpstreamError {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Error detail.
        message: String,
    },

    /// The pull request exists but its diff has no reviewable content.
    #[error("the pull request seems to be empty or contains no code changes")]
    EmptyChange,

    /// The review engine failed to produce a result.
    #[error("review failed: {message}")]
    ReviewEngine {
        /// Engine failure detail.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// The GitHub client could not be configured.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },
}

#[expect(clippy::ref_option, reason = "thiserror passes formatting fields by reference")]
fn status_suffix(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |code| format!(" (status {code})"))
}
