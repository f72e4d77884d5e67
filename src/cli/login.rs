//! Browser sign-in mode using OAuth with PKCE.
//!
//! Without a callback URL the mode prints the provider authorization URL,
//! listens on the redirect URI for the browser to return, and completes the
//! exchange. With `--callback-url` it completes a redirect the user copied
//! out of the browser instead.

use std::io::{self, Write};

use diffscope::auth::{CallbackServer, OAuthCallback, OAuthInitiator, SignInOutcome};
use diffscope::{AppError, AuthError, DiffscopeConfig, GitHubUser};
use url::Url;

use super::SessionRuntime;
use super::output::io_error;

/// Runs the OAuth sign-in mode.
///
/// # Errors
///
/// Returns an error if the client ID is missing, the listener cannot be
/// bound, the provider reports an error, the exchange or verification
/// fails, or writing output fails.
pub async fn run(config: &DiffscopeConfig, runtime: &SessionRuntime) -> Result<(), AppError> {
    let mut stdout = io::stdout();
    if let Some(callback_url) = config.callback_url.as_deref() {
        return complete_pasted_redirect(&mut stdout, runtime, callback_url).await;
    }
    browser_sign_in(&mut stdout, config, runtime).await
}

async fn complete_pasted_redirect<W: Write>(
    writer: &mut W,
    runtime: &SessionRuntime,
    callback_url: &str,
) -> Result<(), AppError> {
    let url = Url::parse(callback_url).map_err(|error| {
        AppError::configuration(format!("callback URL '{callback_url}' is not a valid URL: {error}"))
    })?;
    let redirect = OAuthCallback::from_redirect_url(&url)?.ok_or_else(|| {
        AppError::configuration("callback URL carries no 'code' parameter")
    })?;
    tracing::debug!(stripped = %redirect.stripped_url, "completing pasted OAuth redirect");

    let user = runtime.controller.complete_oauth(&redirect.callback).await?;
    write_signed_in(writer, &user)
}

async fn browser_sign_in<W: Write>(
    writer: &mut W,
    config: &DiffscopeConfig,
    runtime: &SessionRuntime,
) -> Result<(), AppError> {
    let redirect_uri = config.redirect_uri()?;
    let initiator = OAuthInitiator::new(config.oauth_settings()?, runtime.stash.clone());
    let authorize_url = initiator.build_authorization_url()?;
    let server = CallbackServer::bind(&redirect_uri).await?;

    writeln!(
        writer,
        concat!(
            "Open this URL in your browser to sign in with GitHub:\n\n",
            "  {authorize_url}\n\n",
            "Waiting for the redirect to {redirect_uri} (Ctrl-C to cancel)..."
        ),
        authorize_url = authorize_url,
        redirect_uri = redirect_uri,
    )
    .map_err(|error| io_error(&error))?;
    writer.flush().map_err(|error| io_error(&error))?;

    let mut pending = server.start();
    let callback = tokio::select! {
        received = pending.callback() => received?,
        _ = tokio::signal::ctrl_c() => {
            return Err(AppError::Auth(AuthError::Callback {
                message: "sign-in cancelled".to_owned(),
            }));
        }
    };

    let completed = runtime.controller.complete_oauth(&callback).await;
    pending.finish(outcome_for(&completed)).await;
    write_signed_in(writer, &completed?)
}

fn outcome_for(completed: &Result<GitHubUser, AuthError>) -> SignInOutcome {
    match completed {
        Ok(user) => SignInOutcome::Success {
            login: user.login.clone(),
        },
        Err(error) => SignInOutcome::Failure {
            message: error.to_string(),
        },
    }
}

fn write_signed_in<W: Write>(writer: &mut W, user: &GitHubUser) -> Result<(), AppError> {
    writeln!(writer, "Signed in as {} ({})", user.login, user.html_url)
        .map_err(|error| io_error(&error))
}
