//! GitHub pull request parsing and diff retrieval.
//!
//! This module wraps Octocrab to parse pull request URLs and fetch the unified
//! diff of a pull request, optionally authenticated with the session token.
//! HTTP outcomes are mapped into the review error taxonomy so callers can
//! surface precise, user-actionable failures.

pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;

pub use error::LocatorError;
pub use gateway::{DiffGateway, OctocrabDiffGateway};
pub use locator::{PullRequestLocator, PullRequestNumber, RepositoryName, RepositoryOwner};
pub use models::GitHubUser;

#[cfg(test)]
pub use gateway::MockDiffGateway;
