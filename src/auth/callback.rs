//! OAuth redirect handling: callback URL parsing and the loopback listener.
//!
//! The listener receives the provider's redirect, hands the authorization
//! code to the waiting sign-in flow, and immediately redirects the browser
//! to the same path without the query so the code does not linger in the
//! address bar or history. The follow-up request renders the sign-in result
//! once the flow reports it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify, oneshot, watch};
use tokio::task::JoinHandle;
use url::Url;

use super::error::AuthError;

/// How long the listener keeps serving after the outcome is known, waiting
/// for the browser to fetch the result page.
const RESULT_PAGE_GRACE: Duration = Duration::from_secs(10);

/// Authorization code delivered by the provider redirect.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCallback {
    code: String,
}

impl std::fmt::Debug for OAuthCallback {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("OAuthCallback(<redacted>)")
    }
}

/// A callback plus the redirect URL with its code removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRedirect {
    /// The extracted callback.
    pub callback: OAuthCallback,
    /// The redirect URL without `code`, suitable to show the user.
    pub stripped_url: Url,
}

impl OAuthCallback {
    /// Wraps a raw authorization code.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Callback`] when `code` is blank.
    pub fn new(code: impl Into<String>) -> Result<Self, AuthError> {
        let code_text: String = code.into();
        if code_text.trim().is_empty() {
            return Err(AuthError::Callback {
                message: "the redirect carried an empty authorization code".to_owned(),
            });
        }
        Ok(Self { code: code_text })
    }

    /// The one-time authorization code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Extracts the callback from a full redirect URL.
    ///
    /// Returns `Ok(None)` when the URL carries neither `code` nor `error`.
    /// Every other query parameter is preserved in the stripped URL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Callback`] when the provider redirected with an
    /// `error` parameter or an empty code.
    pub fn from_redirect_url(url: &Url) -> Result<Option<ParsedRedirect>, AuthError> {
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        if let Some(message) = callback_error(&params) {
            return Err(AuthError::Callback { message });
        }
        let Some(code) = params.get("code") else {
            return Ok(None);
        };

        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| name != "code")
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        let mut stripped_url = url.clone();
        if retained.is_empty() {
            stripped_url.set_query(None);
        } else {
            stripped_url
                .query_pairs_mut()
                .clear()
                .extend_pairs(retained);
        }

        Ok(Some(ParsedRedirect {
            callback: Self::new(code.as_str())?,
            stripped_url,
        }))
    }
}

fn callback_error(params: &HashMap<String, String>) -> Option<String> {
    let error = params.get("error")?;
    Some(
        params
            .get("error_description")
            .map_or_else(|| error.clone(), |description| format!("{error}: {description}")),
    )
}

/// Final result of a browser sign-in, shown on the result page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// Signed in as `login`.
    Success {
        /// GitHub login of the signed-in user.
        login: String,
    },
    /// Sign-in failed.
    Failure {
        /// User-facing failure message.
        message: String,
    },
}

type CallbackSender = oneshot::Sender<Result<OAuthCallback, AuthError>>;

#[derive(Clone)]
struct ListenerState {
    callback: Arc<Mutex<Option<CallbackSender>>>,
    outcome: watch::Receiver<Option<SignInOutcome>>,
    served: Arc<Notify>,
    path: Arc<str>,
}

/// Loopback listener bound to the redirect URI's host and port.
#[derive(Debug)]
pub struct CallbackServer {
    listener: TcpListener,
    path: String,
}

impl CallbackServer {
    /// Binds the host and port of `redirect_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Callback`] when the address cannot be resolved
    /// or bound.
    pub async fn bind(redirect_uri: &Url) -> Result<Self, AuthError> {
        let addresses = redirect_uri
            .socket_addrs(|| None)
            .map_err(|error| AuthError::Callback {
                message: format!("redirect URI '{redirect_uri}' has no usable address: {error}"),
            })?;
        let listener = TcpListener::bind(addresses.as_slice())
            .await
            .map_err(|error| AuthError::Callback {
                message: format!("failed to listen on '{redirect_uri}': {error}"),
            })?;
        Ok(Self {
            listener,
            path: redirect_uri.path().to_owned(),
        })
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Callback`] when the socket address is unavailable.
    pub fn local_addr(&self) -> Result<SocketAddr, AuthError> {
        self.listener
            .local_addr()
            .map_err(|error| AuthError::Callback {
                message: format!("callback listener has no local address: {error}"),
            })
    }

    /// Starts serving in the background.
    #[must_use]
    pub fn start(self) -> PendingCallback {
        let (callback_tx, callback_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let served = Arc::new(Notify::new());

        let state = ListenerState {
            callback: Arc::new(Mutex::new(Some(callback_tx))),
            outcome: outcome_rx,
            served: Arc::clone(&served),
            path: Arc::from(self.path.as_str()),
        };
        let app = Router::new()
            .route(&self.path, get(handle_redirect))
            .with_state(state);

        let shutdown = Arc::clone(&served);
        let server = tokio::spawn(async move {
            let serving = axum::serve(self.listener, app)
                .with_graceful_shutdown(async move { shutdown.notified().await });
            if let Err(error) = serving.await {
                tracing::warn!(%error, "OAuth callback listener failed");
            }
        });

        PendingCallback {
            callback: callback_rx,
            outcome: outcome_tx,
            served,
            server,
        }
    }
}

/// A running listener waiting for the provider redirect.
#[derive(Debug)]
pub struct PendingCallback {
    callback: oneshot::Receiver<Result<OAuthCallback, AuthError>>,
    outcome: watch::Sender<Option<SignInOutcome>>,
    served: Arc<Notify>,
    server: JoinHandle<()>,
}

impl PendingCallback {
    /// Waits for the browser to deliver the redirect.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Callback`] when the provider reported an error
    /// or the listener stopped first.
    pub async fn callback(&mut self) -> Result<OAuthCallback, AuthError> {
        (&mut self.callback)
            .await
            .map_err(|_| AuthError::Callback {
                message: "the callback listener stopped before a redirect arrived".to_owned(),
            })?
    }

    /// Publishes the outcome, lets the browser fetch the result page, and
    /// stops the listener.
    pub async fn finish(self, outcome: SignInOutcome) {
        self.outcome.send_replace(Some(outcome));
        let mut server = self.server;
        if tokio::time::timeout(RESULT_PAGE_GRACE, &mut server)
            .await
            .is_err()
        {
            tracing::debug!("result page not requested; stopping callback listener");
            self.served.notify_one();
            drop(server.await);
        }
    }
}

async fn handle_redirect(
    State(state): State<ListenerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let delivered = if let Some(message) = callback_error(&params) {
        Some(Err(AuthError::Callback { message }))
    } else {
        params.get("code").map(|code| OAuthCallback::new(code.as_str()))
    };

    if let Some(result) = delivered {
        if let Some(sender) = state.callback.lock().await.take() {
            drop(sender.send(result));
        }
        return Redirect::to(&state.path).into_response();
    }

    let mut outcome = state.outcome.clone();
    let page = match outcome.wait_for(Option::is_some).await {
        Ok(current) => render_outcome(current.as_ref()),
        Err(_) => render_outcome(None),
    };
    state.served.notify_one();
    Html(page).into_response()
}

fn render_outcome(outcome: Option<&SignInOutcome>) -> String {
    let (title, detail) = match outcome {
        Some(SignInOutcome::Success { login }) => (
            "Authentication successful!".to_owned(),
            format!(
                "Signed in as {}. You can close this tab and return to the terminal.",
                escape_html(login)
            ),
        ),
        Some(SignInOutcome::Failure { message }) => {
            ("Authentication failed".to_owned(), escape_html(message))
        }
        None => (
            "Authentication failed".to_owned(),
            "The sign-in was abandoned.".to_owned(),
        ),
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>diffscope</title></head>\n\
         <body style=\"font-family: system-ui; text-align: center; padding-top: 80px;\">\n\
         <h2>{title}</h2>\n<p>{detail}</p>\n</body>\n</html>"
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
