//! High-level review facade used by the CLI.

use crate::auth::AccessToken;
use crate::github::{DiffGateway, PullRequestLocator};

use super::engine::ReviewEngine;
use super::error::ReviewError;
use super::model::ReviewResult;

/// Validates a pull request URL, loads its diff and asks the engine for a
/// review.
///
/// Holds no state between calls.
pub struct PullRequestReviewer<'client, Gateway, Engine>
where
    Gateway: DiffGateway,
    Engine: ReviewEngine,
{
    gateway: &'client Gateway,
    engine: &'client Engine,
}

impl<'client, Gateway, Engine> PullRequestReviewer<'client, Gateway, Engine>
where
    Gateway: DiffGateway,
    Engine: ReviewEngine,
{
    /// Create a new reviewer using the provided gateway and engine.
    #[must_use]
    pub const fn new(gateway: &'client Gateway, engine: &'client Engine) -> Self {
        Self { gateway, engine }
    }

    /// Review the pull request at `url_text`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::InvalidInput`] without touching the network
    /// when `url_text` is not a pull request URL,
    /// [`ReviewError::EmptyChange`] when the diff has no content, any
    /// gateway failure unchanged, and [`ReviewError::ReviewEngine`] when the
    /// engine fails.
    pub async fn review(
        &self,
        url_text: &str,
        token: Option<AccessToken>,
    ) -> Result<ReviewResult, ReviewError> {
        let locator = PullRequestLocator::parse(url_text)?;
        let diff = self.gateway.fetch_diff(&locator, token).await?;

        if diff.trim().is_empty() {
            return Err(ReviewError::EmptyChange);
        }

        self.engine
            .review_diff(&diff)
            .await
            .map_err(|error| match error {
                ReviewError::ReviewEngine { .. } => error,
                other => ReviewError::ReviewEngine {
                    message: other.to_string(),
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::PullRequestReviewer;
    use crate::auth::AccessToken;
    use crate::github::{LocatorError, MockDiffGateway};
    use crate::review::{
        BreakageRisk, CodeIssue, MockReviewEngine, ReviewError, ReviewResult, Severity,
    };

    const PR_URL: &str = "https://github.com/acme/widgets/pull/42";

    #[fixture]
    fn clean_review() -> ReviewResult {
        ReviewResult {
            summary: "Small, well-tested change.".to_owned(),
            overall_score: 90,
            breakage_risk: BreakageRisk::Low,
            issues: vec![CodeIssue {
                severity: Severity::Low,
                file_path: "a/src/widget.rs".to_owned(),
                description: "name is vague".to_owned(),
                suggestion: "rename to `widget_count`".to_owned(),
            }],
        }
    }

    #[rstest]
    #[tokio::test]
    async fn reviews_public_pull_request(clean_review: ReviewResult) {
        let mut gateway = MockDiffGateway::new();
        gateway
            .expect_fetch_diff()
            .withf(|locator, token| {
                locator.owner().as_str() == "acme"
                    && locator.repository().as_str() == "widgets"
                    && locator.number().get() == 42
                    && token.is_none()
            })
            .times(1)
            .returning(|_, _| Ok("diff --git a/x b/x\n+line\n".to_owned()));

        let mut engine = MockReviewEngine::new();
        let expected = clean_review.clone();
        engine
            .expect_review_diff()
            .withf(|diff| diff == "diff --git a/x b/x\n+line\n")
            .times(1)
            .returning(move |_| Ok(expected.clone()));

        let result = PullRequestReviewer::new(&gateway, &engine)
            .review(PR_URL, None)
            .await
            .expect("review should succeed");

        assert_eq!(result, clean_review);
    }

    #[rstest]
    #[tokio::test]
    async fn forwards_token_to_gateway(clean_review: ReviewResult) {
        let mut gateway = MockDiffGateway::new();
        gateway
            .expect_fetch_diff()
            .withf(|_, token| {
                token
                    .as_ref()
                    .is_some_and(|value| value.expose() == "ghp_private")
            })
            .times(1)
            .returning(|_, _| Ok("+private\n".to_owned()));

        let mut engine = MockReviewEngine::new();
        engine
            .expect_review_diff()
            .times(1)
            .returning(move |_| Ok(clean_review.clone()));

        let token = AccessToken::new("ghp_private").expect("token should be valid");
        PullRequestReviewer::new(&gateway, &engine)
            .review(PR_URL, Some(token))
            .await
            .expect("review should succeed");
    }

    #[rstest]
    #[case::prose("not a url")]
    #[case::issue("https://github.com/acme/widgets/issues/42")]
    #[tokio::test]
    async fn invalid_input_skips_network(#[case] input: &str) {
        let mut gateway = MockDiffGateway::new();
        gateway.expect_fetch_diff().never();
        let mut engine = MockReviewEngine::new();
        engine.expect_review_diff().never();

        let error = PullRequestReviewer::new(&gateway, &engine)
            .review(input, None)
            .await
            .expect_err("invalid input should fail");

        assert!(
            matches!(error, ReviewError::InvalidInput(_)),
            "expected InvalidInput, got {error:?}"
        );
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("  \n\t\n")]
    #[tokio::test]
    async fn empty_diff_skips_engine(#[case] diff: &'static str) {
        let mut gateway = MockDiffGateway::new();
        gateway
            .expect_fetch_diff()
            .times(1)
            .returning(move |_, _| Ok(diff.to_owned()));
        let mut engine = MockReviewEngine::new();
        engine.expect_review_diff().never();

        let error = PullRequestReviewer::new(&gateway, &engine)
            .review(PR_URL, None)
            .await
            .expect_err("empty diff should fail");

        assert_eq!(error, ReviewError::EmptyChange);
    }

    #[rstest]
    #[tokio::test]
    async fn gateway_errors_propagate_unchanged() {
        let mut gateway = MockDiffGateway::new();
        gateway
            .expect_fetch_diff()
            .times(1)
            .returning(|_, _| Err(ReviewError::NotFoundOrPrivate { status: 404 }));
        let mut engine = MockReviewEngine::new();
        engine.expect_review_diff().never();

        let error = PullRequestReviewer::new(&gateway, &engine)
            .review(PR_URL, None)
            .await
            .expect_err("404 should fail");

        assert_eq!(error, ReviewError::NotFoundOrPrivate { status: 404 });
    }

    #[rstest]
    #[tokio::test]
    async fn engine_failures_map_to_review_engine_error() {
        let mut gateway = MockDiffGateway::new();
        gateway
            .expect_fetch_diff()
            .returning(|_, _| Ok("+x\n".to_owned()));
        let mut engine = MockReviewEngine::new();
        engine.expect_review_diff().returning(|_| {
            Err(ReviewError::Network {
                message: "connection reset".to_owned(),
            })
        });

        let error = PullRequestReviewer::new(&gateway, &engine)
            .review(PR_URL, None)
            .await
            .expect_err("engine failure should propagate");

        assert!(
            matches!(&error, ReviewError::ReviewEngine { message } if message.contains("connection reset")),
            "unexpected error: {error:?}"
        );
    }

    #[rstest]
    fn invalid_input_error_mentions_url() {
        let error = ReviewError::from(LocatorError::MissingPathSegments);
        assert!(error.to_string().contains("valid GitHub pull request URL"));
    }
}
