//! Token verification against the GitHub user endpoint.

use async_trait::async_trait;
use http::Uri;

use crate::github::GitHubUser;
use crate::github::gateway::{JSON_MEDIA_TYPE, build_octocrab_client, request_headers};

use super::token::AccessToken;

/// Outcome of checking a token with GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// GitHub accepted the token and identified its owner.
    Verified(GitHubUser),
    /// The token could not be confirmed.
    Rejected {
        /// Why, for debug logging.
        reason: String,
    },
}

/// Confirms that a token belongs to a GitHub user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies `token`. Never fails; problems are reported as
    /// [`Verification::Rejected`].
    async fn verify(&self, token: &AccessToken) -> Verification;
}

/// Verifier calling `GET /user` through Octocrab.
#[derive(Debug, Clone)]
pub struct GitHubTokenVerifier {
    api_base: String,
}

impl GitHubTokenVerifier {
    /// Creates a verifier for the API at `api_base`
    /// (e.g. `https://api.github.com`).
    #[must_use]
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
        }
    }

    async fn fetch_user(&self, token: &AccessToken) -> Result<GitHubUser, String> {
        let client = build_octocrab_client(&self.api_base).map_err(|error| error.to_string())?;
        let headers = request_headers(JSON_MEDIA_TYPE, Some(token))
            .ok_or_else(|| "token cannot be sent as a header".to_owned())?;
        let uri = Uri::from_static("/user");

        let response = client
            ._get_with_headers(uri, Some(headers))
            .await
            .map_err(|error| format!("user request failed: {error}"))?;
        let status = response.status();
        let body = client
            .body_to_string(response)
            .await
            .map_err(|error| format!("user response unreadable: {error}"))?;

        if !status.is_success() {
            return Err(format!("GitHub answered {}", status.as_u16()));
        }

        serde_json::from_str(&body).map_err(|error| format!("user response malformed: {error}"))
    }
}

#[async_trait]
impl TokenVerifier for GitHubTokenVerifier {
    async fn verify(&self, token: &AccessToken) -> Verification {
        match self.fetch_user(token).await {
            Ok(user) => Verification::Verified(user),
            Err(reason) => {
                tracing::debug!(%reason, "token verification rejected");
                Verification::Rejected { reason }
            }
        }
    }
}
