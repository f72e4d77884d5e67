//! Scenario state and review harness for the pull request review BDD tests.

use std::time::Duration;

use diffscope::review::OpenAiReviewConfig;
use diffscope::{
    OctocrabDiffGateway, OpenAiReviewEngine, PullRequestReviewer, ReviewError, ReviewResult,
};
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use wiremock::{Mock, MockServer};

use super::runtime::{SharedRuntime, ensure_runtime_and_server};

/// Path the review engine posts to, relative to the mock server.
pub(crate) const AI_COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(ScenarioState, Default)]
pub(crate) struct ReviewState {
    pub(crate) runtime: Slot<SharedRuntime>,
    pub(crate) server: Slot<MockServer>,
    pub(crate) result: Slot<ReviewResult>,
    pub(crate) error: Slot<ReviewError>,
}

/// API path serving the diff of pull request `number` in `acme/widgets`.
pub(crate) fn github_diff_path(number: u64) -> String {
    format!("/api/v3/repos/acme/widgets/pulls/{number}")
}

/// Mounts `mock` on the scenario server, starting it if needed.
pub(crate) fn mount(review_state: &ReviewState, mock: Mock) -> Result<(), String> {
    let runtime = ensure_runtime_and_server(&review_state.runtime, &review_state.server)
        .map_err(|error| format!("failed to start mock server: {error}"))?;
    review_state
        .server
        .with_ref(|server| runtime.block_on(mock.mount(server)))
        .ok_or_else(|| "mock server not initialised".to_owned())
}

/// Base URI of the scenario server.
pub(crate) fn server_uri(review_state: &ReviewState) -> Result<String, String> {
    review_state
        .server
        .with_ref(MockServer::uri)
        .ok_or_else(|| "mock server not initialised".to_owned())
}

/// Reviews `url` against the scenario server and records the outcome.
pub(crate) fn review_pull_request(review_state: &ReviewState, url: &str) -> Result<(), String> {
    let runtime = ensure_runtime_and_server(&review_state.runtime, &review_state.server)
        .map_err(|error| format!("failed to start mock server: {error}"))?;
    let engine = OpenAiReviewEngine::new(OpenAiReviewConfig::new(
        format!("{}/v1", server_uri(review_state)?),
        "gpt-4o-mini",
        Some("test-key".to_owned()),
        Duration::from_secs(5),
    ));
    let gateway = OctocrabDiffGateway::new();
    let reviewer = PullRequestReviewer::new(&gateway, &engine);

    match runtime.block_on(reviewer.review(url, None)) {
        Ok(result) => {
            drop(review_state.error.take());
            review_state.result.set(result);
        }
        Err(error) => {
            drop(review_state.result.take());
            review_state.error.set(error);
        }
    }
    Ok(())
}
