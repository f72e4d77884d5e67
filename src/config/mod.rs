//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.diffscope.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `DIFFSCOPE_PR_URL`, `DIFFSCOPE_TOKEN`, and
//!    so on, plus `OPENAI_API_KEY` as a fallback for the review engine key
//! 4. **Command-line arguments** – `--pr-url`/`-u`, `--token`/`-t`, ...
//!
//! # Configuration File
//!
//! ```toml
//! github_client_id = "Iv1.0123456789abcdef"
//! redirect_uri = "http://127.0.0.1:8976/"
//! auth_backend_url = "https://auth.example.com/v1/auth/github"
//! ai_model = "gpt-4o-mini"
//! telemetry = true
//! ```

use std::env;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::OAuthSettings;
use crate::error::AppError;
use crate::review::OpenAiReviewConfig;

/// Environment variable consulted when no review engine key is configured.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8976/";
const DEFAULT_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const DEFAULT_AUTH_BACKEND_URL: &str = "http://localhost:8080/v1/auth/github";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_AI_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_SYNC_POLL_MILLIS: u64 = 1_000;
const APP_DIR_NAME: &str = "diffscope";

/// Operation mode determined by CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Remove the saved token.
    Logout,
    /// Sign in through the browser with OAuth, or complete a pasted
    /// redirect URL.
    OAuthLogin,
    /// Follow session changes made by other processes.
    Watch,
    /// Review a pull request.
    Review,
    /// Sign in with a personal access token.
    SignIn,
    /// Report the current session.
    Status,
}

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use diffscope::DiffscopeConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = DiffscopeConfig::load().expect("failed to load configuration");
/// let mode = config.operation_mode();
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "DIFFSCOPE",
    discovery(
        dotfile_name = ".diffscope.toml",
        config_file_name = "diffscope.toml",
        app_name = "diffscope"
    )
)]
pub struct DiffscopeConfig {
    /// GitHub pull request URL to review.
    ///
    /// Can be provided via:
    /// - CLI: `--pr-url <URL>` or `-u <URL>`
    /// - Environment: `DIFFSCOPE_PR_URL`
    /// - Config file: `pr_url = "..."`
    #[ortho_config(cli_short = 'u')]
    pub pr_url: Option<String>,

    /// Personal access token to sign in with.
    ///
    /// The token is verified and saved. Combined with `pr_url` it signs in
    /// before the review runs.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `DIFFSCOPE_TOKEN`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Starts the browser sign-in flow.
    ///
    /// Can be provided via:
    /// - CLI: `--login` / `-l`
    #[ortho_config(cli_short = 'l')]
    pub login: bool,

    /// Completes sign-in from a redirect URL copied out of the browser.
    ///
    /// Can be provided via:
    /// - CLI: `--callback-url <URL>`
    /// - Environment: `DIFFSCOPE_CALLBACK_URL`
    #[ortho_config()]
    pub callback_url: Option<String>,

    /// Removes the saved token.
    ///
    /// Can be provided via:
    /// - CLI: `--logout`
    #[ortho_config()]
    pub logout: bool,

    /// Keeps running and reports session changes made by other processes.
    ///
    /// Can be provided via:
    /// - CLI: `--watch` / `-w`
    #[ortho_config(cli_short = 'w')]
    pub watch: bool,

    /// OAuth application client ID used for browser sign-in.
    ///
    /// Can be provided via:
    /// - CLI: `--github-client-id <ID>`
    /// - Environment: `DIFFSCOPE_GITHUB_CLIENT_ID`
    /// - Config file: `github_client_id = "..."`
    #[ortho_config()]
    pub github_client_id: Option<String>,

    /// Redirect URI registered with the OAuth application.
    ///
    /// The login flow listens on its host and port. Defaults to
    /// `http://127.0.0.1:8976/`.
    #[ortho_config()]
    pub redirect_uri: String,

    /// OAuth authorize endpoint.
    #[ortho_config()]
    pub authorize_url: String,

    /// Token-exchange backend endpoint.
    #[ortho_config()]
    pub auth_backend_url: String,

    /// GitHub REST API base used to verify tokens.
    #[ortho_config()]
    pub github_api_url: String,

    /// Directory holding the saved token and the pending code verifier.
    ///
    /// Defaults to `$XDG_STATE_HOME/diffscope`, else
    /// `$HOME/.local/state/diffscope`.
    #[ortho_config()]
    pub state_dir: Option<String>,

    /// Interval, in milliseconds, at which the state directory is polled
    /// for changes made by other processes.
    #[ortho_config()]
    pub sync_poll_millis: u64,

    /// Base URL of the OpenAI-compatible review API.
    #[ortho_config()]
    pub ai_base_url: String,

    /// Model used for reviews.
    #[ortho_config()]
    pub ai_model: String,

    /// API key for the review engine.
    ///
    /// Can be provided via:
    /// - CLI: `--ai-api-key <KEY>`
    /// - Environment: `DIFFSCOPE_AI_API_KEY` or `OPENAI_API_KEY`
    #[ortho_config()]
    pub ai_api_key: Option<String>,

    /// Review request timeout in seconds.
    #[ortho_config()]
    pub ai_timeout_seconds: u64,

    /// Emits telemetry events to stderr as JSON lines.
    ///
    /// Can be provided via:
    /// - CLI: `--telemetry`
    /// - Config file: `telemetry = true`
    ///
    /// Note: boolean values are not loaded from the environment.
    #[ortho_config()]
    pub telemetry: bool,
}

impl Default for DiffscopeConfig {
    fn default() -> Self {
        Self {
            pr_url: None,
            token: None,
            login: false,
            callback_url: None,
            logout: false,
            watch: false,
            github_client_id: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_owned(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_owned(),
            auth_backend_url: DEFAULT_AUTH_BACKEND_URL.to_owned(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_owned(),
            state_dir: None,
            sync_poll_millis: DEFAULT_SYNC_POLL_MILLIS,
            ai_base_url: DEFAULT_AI_BASE_URL.to_owned(),
            ai_model: DEFAULT_AI_MODEL.to_owned(),
            ai_api_key: None,
            ai_timeout_seconds: DEFAULT_AI_TIMEOUT_SECONDS,
            telemetry: false,
        }
    }
}

impl DiffscopeConfig {
    /// Determines the operation mode based on provided configuration.
    ///
    /// Precedence: logout, OAuth login (`login` or `callback_url`), watch,
    /// review (`pr_url`), manual sign-in (`token`), then status.
    #[must_use]
    pub const fn operation_mode(&self) -> OperationMode {
        if self.logout {
            OperationMode::Logout
        } else if self.login || self.callback_url.is_some() {
            OperationMode::OAuthLogin
        } else if self.watch {
            OperationMode::Watch
        } else if self.pr_url.is_some() {
            OperationMode::Review
        } else if self.token.is_some() {
            OperationMode::SignIn
        } else {
            OperationMode::Status
        }
    }

    /// Returns the pull request URL or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] when no URL is configured.
    pub fn require_pr_url(&self) -> Result<&str, AppError> {
        self.pr_url.as_deref().ok_or_else(|| {
            AppError::configuration("pull request URL is required (use --pr-url or -u)")
        })
    }

    /// Resolves the review engine key, falling back to `OPENAI_API_KEY`.
    ///
    /// Blank values are treated as absent.
    #[must_use]
    pub fn resolve_ai_api_key(&self) -> Option<String> {
        self.ai_api_key
            .clone()
            .or_else(|| env::var(OPENAI_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Builds the review engine settings.
    #[must_use]
    pub fn review_engine_config(&self) -> OpenAiReviewConfig {
        OpenAiReviewConfig::new(
            self.ai_base_url.clone(),
            self.ai_model.clone(),
            self.resolve_ai_api_key(),
            Duration::from_secs(self.ai_timeout_seconds),
        )
    }

    /// Resolves the state directory.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] when no directory is configured
    /// and neither `XDG_STATE_HOME` nor `HOME` is set.
    pub fn resolve_state_dir(&self) -> Result<Utf8PathBuf, AppError> {
        let configured = self
            .state_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty());
        if let Some(configured) = configured {
            return Ok(Utf8PathBuf::from(configured));
        }
        if let Some(state_home) = non_empty_env("XDG_STATE_HOME") {
            return Ok(Utf8PathBuf::from(state_home).join(APP_DIR_NAME));
        }
        non_empty_env("HOME")
            .map(|home| {
                Utf8PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_DIR_NAME)
            })
            .ok_or_else(|| {
                AppError::configuration(
                    "cannot locate a state directory (set --state-dir, XDG_STATE_HOME or HOME)",
                )
            })
    }

    /// Interval between polls of the state directory.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] when `sync_poll_millis` is zero.
    pub fn sync_poll_interval(&self) -> Result<Duration, AppError> {
        if self.sync_poll_millis == 0 {
            return Err(AppError::configuration(
                "sync_poll_millis must be at least 1",
            ));
        }
        Ok(Duration::from_millis(self.sync_poll_millis))
    }

    /// Parses the redirect URI.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] when it is not a valid URL.
    pub fn redirect_uri(&self) -> Result<Url, AppError> {
        parse_url("redirect_uri", &self.redirect_uri)
    }

    /// Parses the token-exchange backend URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] when it is not a valid URL.
    pub fn auth_backend_url(&self) -> Result<Url, AppError> {
        parse_url("auth_backend_url", &self.auth_backend_url)
    }

    /// Builds the OAuth settings for the authorization request.
    ///
    /// A missing client ID is not an error here; it is reported when an
    /// authorization URL is requested.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] when a URL is invalid.
    pub fn oauth_settings(&self) -> Result<OAuthSettings, AppError> {
        Ok(OAuthSettings {
            client_id: self.github_client_id.clone(),
            authorize_url: parse_url("authorize_url", &self.authorize_url)?,
            redirect_uri: self.redirect_uri()?,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_url(field: &str, value: &str) -> Result<Url, AppError> {
    Url::parse(value).map_err(|error| {
        AppError::configuration(format!("{field} '{value}' is not a valid URL: {error}"))
    })
}
