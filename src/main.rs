//! Diffscope CLI entrypoint for AI-assisted pull request review.

use std::io::{self, Write};
use std::process::ExitCode;

use diffscope::{AppError, DiffscopeConfig, OperationMode};
use ortho_config::OrthoConfig;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{SessionRuntime, login, review, sign_in, status, telemetry_sink, watch};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let config = load_config()?;
    let telemetry = telemetry_sink(&config);
    let runtime = SessionRuntime::open(&config, telemetry.clone())?;

    match config.operation_mode() {
        OperationMode::Logout => status::run_logout(&runtime),
        OperationMode::OAuthLogin => login::run(&config, &runtime).await,
        OperationMode::Watch => watch::run(&config, &runtime).await,
        OperationMode::Review => review::run(&config, &runtime, telemetry.as_ref()).await,
        OperationMode::SignIn => {
            let raw_token = config.token.as_deref().unwrap_or_default();
            sign_in::run(&runtime, raw_token).await
        }
        OperationMode::Status => status::run(&runtime).await,
    }
}

/// Logs to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`AppError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<DiffscopeConfig, AppError> {
    DiffscopeConfig::load().map_err(|error| AppError::Configuration {
        message: error.to_string(),
    })
}
