//! Exchange of an OAuth authorization code for an access token.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::AuthError;
use super::pkce::PkceStash;
use super::token::AccessToken;

/// Turns a one-time authorization code into a bearer token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchanges `code` using the stashed code verifier.
    async fn exchange(&self, code: &str) -> Result<AccessToken, AuthError>;
}

/// Exchanger posting to the trusted token-exchange backend.
///
/// The backend holds the OAuth client secret; this side only supplies the
/// code, the verifier and the redirect URI.
#[derive(Debug, Clone)]
pub struct BackendTokenExchanger {
    backend_url: Url,
    redirect_uri: Url,
    stash: PkceStash,
    client: Client,
}

impl BackendTokenExchanger {
    /// Creates an exchanger for the backend at `backend_url`.
    #[must_use]
    pub fn new(backend_url: Url, redirect_uri: Url, stash: PkceStash) -> Self {
        Self {
            backend_url,
            redirect_uri,
            stash,
            client: Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
    verifier: &'a str,
    redirect_uri: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[async_trait]
impl TokenExchanger for BackendTokenExchanger {
    async fn exchange(&self, code: &str) -> Result<AccessToken, AuthError> {
        // Consumed before the request so a failed exchange cannot be replayed.
        let verifier = self.stash.take()?.ok_or(AuthError::SessionExpired)?;

        let payload = ExchangeRequest {
            code,
            verifier: &verifier,
            redirect_uri: self.redirect_uri.as_str(),
        };

        let response = self
            .client
            .post(self.backend_url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|error| AuthError::Network {
                message: format!("token exchange request failed: {error}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_owned());
            tracing::debug!(status = status.as_u16(), %detail, "token exchange failed");
            return Err(AuthError::ExchangeFailed {
                status: status.as_u16(),
            });
        }

        let body: ExchangeResponse = response.json().await.map_err(|error| {
            tracing::debug!(%error, "token exchange response was not JSON");
            AuthError::MalformedResponse
        })?;

        body.access_token
            .and_then(|value| AccessToken::new(value).ok())
            .ok_or(AuthError::MalformedResponse)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::{fixture, rstest};
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{BackendTokenExchanger, TokenExchanger};
    use crate::auth::AuthError;
    use crate::auth::pkce::PkceStash;
    use crate::auth::storage::{MemoryStorageBackend, StorageHub};

    const EXCHANGE_PATH: &str = "/v1/auth/github";

    struct ExchangeFixture {
        server: MockServer,
        stash: PkceStash,
        exchanger: BackendTokenExchanger,
    }

    #[fixture]
    async fn exchange_fixture() -> ExchangeFixture {
        let server = MockServer::start().await;
        let stash =
            PkceStash::new(StorageHub::new(Arc::new(MemoryStorageBackend::new())).open_handle());
        let backend_url =
            Url::parse(&format!("{}{EXCHANGE_PATH}", server.uri())).expect("mock URL");
        let redirect_uri = Url::parse("http://127.0.0.1:8976/").expect("static URL");
        let exchanger = BackendTokenExchanger::new(backend_url, redirect_uri, stash.clone());
        ExchangeFixture {
            server,
            stash,
            exchanger,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn posts_code_verifier_and_redirect(#[future] exchange_fixture: ExchangeFixture) {
        let fixture = exchange_fixture.await;
        fixture.stash.put("verifier-1").expect("put should succeed");

        Mock::given(method("POST"))
            .and(path(EXCHANGE_PATH))
            .and(body_json(json!({
                "code": "abc",
                "verifier": "verifier-1",
                "redirect_uri": "http://127.0.0.1:8976/"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gho_new"
            })))
            .expect(1)
            .mount(&fixture.server)
            .await;

        let token = fixture
            .exchanger
            .exchange("abc")
            .await
            .expect("exchange should succeed");

        assert_eq!(token.expose(), "gho_new");
        assert_eq!(fixture.stash.take().expect("stash readable"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_verifier_is_session_expired(#[future] exchange_fixture: ExchangeFixture) {
        let fixture = exchange_fixture.await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&fixture.server)
            .await;

        let error = fixture
            .exchanger
            .exchange("abc")
            .await
            .expect_err("exchange should fail");

        assert_eq!(error, AuthError::SessionExpired);
    }

    #[rstest]
    #[tokio::test]
    async fn backend_failure_reports_status_and_consumes_verifier(
        #[future] exchange_fixture: ExchangeFixture,
    ) {
        let fixture = exchange_fixture.await;
        fixture.stash.put("verifier-2").expect("put should succeed");

        Mock::given(method("POST"))
            .and(path(EXCHANGE_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&fixture.server)
            .await;

        let error = fixture
            .exchanger
            .exchange("abc")
            .await
            .expect_err("exchange should fail");

        assert_eq!(error, AuthError::ExchangeFailed { status: 500 });
        assert!(error.to_string().contains("500"));
        assert_eq!(fixture.stash.take().expect("stash readable"), None);
    }

    #[rstest]
    #[case::missing_field(json!({ "token_type": "bearer" }))]
    #[case::empty_token(json!({ "access_token": "" }))]
    #[tokio::test]
    async fn success_without_token_is_malformed(
        #[future] exchange_fixture: ExchangeFixture,
        #[case] body: serde_json::Value,
    ) {
        let fixture = exchange_fixture.await;
        fixture.stash.put("verifier-3").expect("put should succeed");

        Mock::given(method("POST"))
            .and(path(EXCHANGE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&fixture.server)
            .await;

        let error = fixture
            .exchanger
            .exchange("abc")
            .await
            .expect_err("exchange should fail");

        assert_eq!(error, AuthError::MalformedResponse);
    }

    #[rstest]
    #[tokio::test]
    async fn transport_failure_is_network_error() {
        let stash =
            PkceStash::new(StorageHub::new(Arc::new(MemoryStorageBackend::new())).open_handle());
        stash.put("verifier-4").expect("put should succeed");
        let exchanger = BackendTokenExchanger::new(
            Url::parse("http://127.0.0.1:9/v1/auth/github").expect("static URL"),
            Url::parse("http://127.0.0.1:8976/").expect("static URL"),
            stash,
        );

        let error = exchanger
            .exchange("abc")
            .await
            .expect_err("exchange should fail");

        assert!(
            matches!(error, AuthError::Network { .. }),
            "expected network error, got {error:?}"
        );
    }
}
