//! Diffscope library crate providing AI-assisted pull request review.
//!
//! The library parses GitHub pull request URLs, fetches their diffs, asks an
//! OpenAI-compatible model for a structured review, and keeps a GitHub
//! session (OAuth PKCE or personal access token) consistent across every
//! process sharing the same state directory.

pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod review;
pub mod telemetry;

pub use auth::{
    AccessToken, AuthError, CredentialStore, GitHubTokenVerifier, Session, SessionController,
    StorageHub, TokenVerifier,
};
pub use config::{DiffscopeConfig, OperationMode};
pub use error::AppError;
pub use github::{GitHubUser, LocatorError, OctocrabDiffGateway, PullRequestLocator};
pub use review::{
    CodeIssue, OpenAiReviewEngine, PullRequestReviewer, ReviewEngine, ReviewError, ReviewResult,
};
