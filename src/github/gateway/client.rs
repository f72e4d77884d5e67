//! Octocrab client construction helpers shared by GitHub callers.

use http::Uri;
use octocrab::Octocrab;
use thiserror::Error;

/// Failure to construct an Octocrab client for an API base.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientBuildError {
    /// The API base could not be parsed as a URI.
    #[error("GitHub API base '{base}' is invalid: {message}")]
    InvalidBase {
        /// The rejected base value.
        base: String,
        /// Parser error detail.
        message: String,
    },

    /// Octocrab refused to build the client.
    #[error("failed to build GitHub client: {message}")]
    Build {
        /// Builder error detail.
        message: String,
    },
}

/// Builds an unauthenticated Octocrab client for the given API base URL.
///
/// Credentials are attached per request instead of at build time so the same
/// client shape serves anonymous and token-authenticated calls, and so the
/// `Authorization: token <t>` scheme GitHub documents for personal access
/// tokens is used verbatim.
///
/// # Errors
///
/// Returns [`ClientBuildError::InvalidBase`] when the base URI cannot be
/// parsed or [`ClientBuildError::Build`] when Octocrab fails to construct a
/// client.
pub fn build_octocrab_client(api_base: &str) -> Result<Octocrab, ClientBuildError> {
    let base_uri: Uri = api_base
        .parse::<Uri>()
        .map_err(|error| ClientBuildError::InvalidBase {
            base: api_base.to_owned(),
            message: error.to_string(),
        })?;

    Octocrab::builder()
        .base_uri(base_uri)
        .map_err(|error| ClientBuildError::Build {
            message: error.to_string(),
        })?
        .build()
        .map_err(|error| ClientBuildError::Build {
            message: error.to_string(),
        })
}
