//! CLI operation mode handlers.
//!
//! This module contains the implementations for different operation modes:
//! - [`login`]: Browser sign-in through OAuth PKCE, or completing a pasted
//!   redirect URL
//! - [`review`]: Review a single pull request
//! - [`sign_in`]: Sign in with a personal access token
//! - [`status`]: Report the current session, or sign out
//! - [`watch`]: Follow session changes made by other processes
//!
//! Output formatting utilities are in [`output`].

use std::sync::Arc;

use diffscope::auth::storage::{FileStorageBackend, StorageBackend};
use diffscope::auth::{BackendTokenExchanger, PkceStash};
use diffscope::telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetrySink};
use diffscope::{
    AppError, CredentialStore, DiffscopeConfig, GitHubTokenVerifier, SessionController,
    StorageHub, TokenVerifier,
};

pub mod login;
pub mod output;
pub mod review;
pub mod sign_in;
pub mod status;
pub mod watch;

#[cfg(test)]
pub mod test_utils;

/// Session plumbing shared by the operation modes.
pub struct SessionRuntime {
    /// Storage shared by every handle in this process.
    pub hub: Arc<StorageHub>,
    /// The authoritative session.
    pub controller: Arc<SessionController>,
    /// Pending PKCE verifier slot.
    pub stash: PkceStash,
}

impl SessionRuntime {
    /// Opens the state directory and wires the GitHub collaborators.
    pub fn open(
        config: &DiffscopeConfig,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Result<Self, AppError> {
        let state_dir = config.resolve_state_dir()?;
        let backend = FileStorageBackend::open(&state_dir)?;
        tracing::debug!(state_dir = %state_dir, "opened session storage");

        let verifier = GitHubTokenVerifier::new(config.github_api_url.clone());
        Self::with_parts(config, Arc::new(backend), Arc::new(verifier), telemetry)
    }

    /// Wires a runtime over explicit storage and verifier.
    pub fn with_parts(
        config: &DiffscopeConfig,
        backend: Arc<dyn StorageBackend>,
        verifier: Arc<dyn TokenVerifier>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Result<Self, AppError> {
        let hub = StorageHub::new(backend);
        let stash = PkceStash::new(hub.open_handle());
        let exchanger = BackendTokenExchanger::new(
            config.auth_backend_url()?,
            config.redirect_uri()?,
            stash.clone(),
        );
        let controller = SessionController::new(
            CredentialStore::new(hub.open_handle()),
            verifier,
            Arc::new(exchanger),
        )
        .with_telemetry(telemetry);

        Ok(Self {
            hub,
            controller: Arc::new(controller),
            stash,
        })
    }
}

/// Selects the telemetry sink requested by configuration.
pub fn telemetry_sink(config: &DiffscopeConfig) -> Arc<dyn TelemetrySink> {
    if config.telemetry {
        Arc::new(StderrJsonlTelemetrySink)
    } else {
        Arc::new(NoopTelemetrySink)
    }
}
