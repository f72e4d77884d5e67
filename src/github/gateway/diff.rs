//! Octocrab implementation of the diff gateway.

use async_trait::async_trait;
use http::Uri;

use crate::auth::AccessToken;
use crate::github::locator::PullRequestLocator;
use crate::review::ReviewError;

use super::DiffGateway;
use super::client::build_octocrab_client;
use super::error_mapping::{map_http_error, map_octocrab_error};
use super::http_utils::{DIFF_MEDIA_TYPE, extract_github_message, request_headers};

/// Octocrab-backed diff gateway.
///
/// A client is built per request from the locator's API base so pull
/// requests on GitHub Enterprise hosts resolve against their own API.
#[derive(Debug, Default, Clone, Copy)]
pub struct OctocrabDiffGateway;

impl OctocrabDiffGateway {
    /// Creates a new gateway.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiffGateway for OctocrabDiffGateway {
    async fn fetch_diff(
        &self,
        locator: &PullRequestLocator,
        token: Option<AccessToken>,
    ) -> Result<String, ReviewError> {
        let client = build_octocrab_client(locator.api_base().as_str()).map_err(|error| {
            ReviewError::Configuration {
                message: error.to_string(),
            }
        })?;
        let uri: Uri = locator
            .pull_request_path()
            .parse::<Uri>()
            .map_err(|error| ReviewError::Configuration {
                message: format!("pull request path is not a valid URI: {error}"),
            })?;
        let headers = request_headers(DIFF_MEDIA_TYPE, token.as_ref()).ok_or_else(|| {
            ReviewError::AuthorizationFailed {
                status: 401,
                message: "token contains characters that cannot be sent to GitHub".to_owned(),
            }
        })?;

        tracing::debug!(
            owner = locator.owner().as_str(),
            repository = locator.repository().as_str(),
            number = locator.number().get(),
            authenticated = token.is_some(),
            "fetching pull request diff"
        );

        let response = client
            ._get_with_headers(uri, Some(headers))
            .await
            .map_err(|error| map_octocrab_error("pull request diff", &error))?;
        let status = response.status();

        let body = client
            .body_to_string(response)
            .await
            .map_err(|error| map_octocrab_error("pull request diff body", &error))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(map_http_error(status, extract_github_message(&body)))
        }
    }
}
