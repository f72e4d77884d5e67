//! Pull request review mode.

use std::io::{self, Write};

use diffscope::github::DiffGateway;
use diffscope::telemetry::{TelemetryEvent, TelemetrySink};
use diffscope::{
    AccessToken, AppError, DiffscopeConfig, OctocrabDiffGateway, OpenAiReviewEngine,
    PullRequestReviewer, ReviewEngine, ReviewResult,
};

use super::SessionRuntime;
use super::output::{io_error, write_review_to};

/// Reviews the configured pull request and prints the report.
///
/// When a token is configured the user is signed in with it first;
/// otherwise the saved session, if any, authenticates the diff request.
///
/// # Errors
///
/// Returns an error if sign-in fails, the review fails, or writing output
/// fails.
pub async fn run(
    config: &DiffscopeConfig,
    runtime: &SessionRuntime,
    telemetry: &dyn TelemetrySink,
) -> Result<(), AppError> {
    let pr_url = config.require_pr_url()?;
    let token = authenticate(runtime, config.token.as_deref()).await?;

    let gateway = OctocrabDiffGateway::new();
    let engine = OpenAiReviewEngine::new(config.review_engine_config());
    let review = review_with(&gateway, &engine, pr_url, token, telemetry).await?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    write_review_to(&mut writer, &review)?;
    writer.flush().map_err(|error| io_error(&error))
}

async fn authenticate(
    runtime: &SessionRuntime,
    raw_token: Option<&str>,
) -> Result<Option<AccessToken>, AppError> {
    if let Some(raw) = raw_token {
        runtime.controller.sign_in_with_token(raw).await?;
        return Ok(runtime.controller.current().token().cloned());
    }

    let session = runtime.controller.start(None).await;
    let token = session.token().cloned();
    if token.is_none() {
        tracing::info!("not signed in; requesting the diff anonymously");
    }
    Ok(token)
}

async fn review_with<Gateway, Engine>(
    gateway: &Gateway,
    engine: &Engine,
    pr_url: &str,
    token: Option<AccessToken>,
    telemetry: &dyn TelemetrySink,
) -> Result<ReviewResult, AppError>
where
    Gateway: DiffGateway,
    Engine: ReviewEngine,
{
    let reviewer = PullRequestReviewer::new(gateway, engine);
    let review = reviewer.review(pr_url, token).await?;

    telemetry.record(TelemetryEvent::ReviewCompleted {
        overall_score: review.overall_score,
        issue_count: review.issues.len(),
    });
    Ok(review)
}
