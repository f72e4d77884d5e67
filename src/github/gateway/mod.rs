//! Gateways for loading pull request diffs through Octocrab.
//!
//! The trait-based design enables mocking in tests while the Octocrab
//! implementation handles real HTTP requests.

mod client;
mod diff;
mod error_mapping;
mod http_utils;

pub use client::{ClientBuildError, build_octocrab_client};
pub use diff::OctocrabDiffGateway;

pub(crate) use http_utils::{JSON_MEDIA_TYPE, request_headers};

use async_trait::async_trait;

use crate::auth::AccessToken;
use crate::github::locator::PullRequestLocator;
use crate::review::ReviewError;

/// Gateway that can load the unified diff of a pull request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiffGateway: Send + Sync {
    /// Fetch the raw diff text, authenticating with `token` when present.
    async fn fetch_diff(
        &self,
        locator: &PullRequestLocator,
        token: Option<AccessToken>,
    ) -> Result<String, ReviewError>;
}
