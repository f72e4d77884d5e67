//! Shared test utilities for CLI tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use diffscope::auth::Verification;
use diffscope::auth::storage::MemoryStorageBackend;
use diffscope::github::DiffGateway;
use diffscope::telemetry::{NoopTelemetrySink, TelemetrySink};
use diffscope::{
    AccessToken, DiffscopeConfig, GitHubUser, PullRequestLocator, ReviewEngine, ReviewError,
    ReviewResult, TokenVerifier,
};

use super::SessionRuntime;

/// Profile returned by [`StaticVerifier::accepting`].
pub fn octocat() -> GitHubUser {
    GitHubUser {
        login: "octocat".to_owned(),
        avatar_url: "https://avatars.example/octocat".to_owned(),
        html_url: "https://github.com/octocat".to_owned(),
    }
}

/// A verifier that answers every token the same way.
#[derive(Debug, Clone)]
pub struct StaticVerifier {
    verification: Verification,
}

impl StaticVerifier {
    /// Accepts every token as belonging to `octocat`.
    pub fn accepting() -> Self {
        Self {
            verification: Verification::Verified(octocat()),
        }
    }

    /// Rejects every token.
    pub fn rejecting() -> Self {
        Self {
            verification: Verification::Rejected {
                reason: "bad credentials".to_owned(),
            },
        }
    }
}

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, _token: &AccessToken) -> Verification {
        self.verification.clone()
    }
}

/// Builds a runtime over in-memory storage.
pub fn memory_runtime(config: &DiffscopeConfig, verifier: StaticVerifier) -> SessionRuntime {
    SessionRuntime::with_parts(
        config,
        Arc::new(MemoryStorageBackend::new()),
        Arc::new(verifier),
        Arc::new(NoopTelemetrySink) as Arc<dyn TelemetrySink>,
    )
    .expect("default configuration should wire a runtime")
}

/// A gateway that captures its inputs and returns a preconfigured diff.
#[derive(Clone, Default)]
pub struct CapturingGateway {
    /// Captured locator and whether a token was supplied.
    pub captured: Arc<Mutex<Option<(PullRequestLocator, bool)>>>,
    /// Diff to return.
    pub diff: String,
}

#[async_trait]
impl DiffGateway for CapturingGateway {
    async fn fetch_diff(
        &self,
        locator: &PullRequestLocator,
        token: Option<AccessToken>,
    ) -> Result<String, ReviewError> {
        self.captured
            .lock()
            .expect("captured mutex should be available")
            .replace((locator.clone(), token.is_some()));
        Ok(self.diff.clone())
    }
}

/// An engine that returns a preconfigured review.
#[derive(Clone)]
pub struct StaticEngine {
    /// Review to return.
    pub result: ReviewResult,
}

#[async_trait]
impl ReviewEngine for StaticEngine {
    async fn review_diff(&self, _diff: &str) -> Result<ReviewResult, ReviewError> {
        Ok(self.result.clone())
    }
}
