//! Error types exposed while parsing pull request URLs.

use thiserror::Error;

/// Errors surfaced while turning user input into a [`PullRequestLocator`].
///
/// [`PullRequestLocator`]: super::PullRequestLocator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    /// The provided URL could not be parsed.
    #[error("pull request URL is invalid: {0}")]
    InvalidUrl(String),

    /// The pull request path is incomplete.
    #[error("pull request URL must match /owner/repo/pull/<number>")]
    MissingPathSegments,

    /// The pull request number is not a valid integer.
    #[error("pull request number must be a positive integer")]
    InvalidPullRequestNumber,
}
