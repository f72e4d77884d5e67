//! Pull request review: diff retrieval, engine invocation and results.

mod engine;
mod error;
mod model;
mod requestor;

pub use engine::{OpenAiReviewConfig, OpenAiReviewEngine, ReviewEngine};
pub use error::ReviewError;
pub use model::{
    BreakageRisk, CodeIssue, MAX_OVERALL_SCORE, ReviewResult, Severity, SeverityOutOfRange,
};
pub use requestor::PullRequestReviewer;

#[cfg(test)]
pub use engine::MockReviewEngine;
