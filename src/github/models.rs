//! Data models returned by the GitHub REST API.

use serde::{Deserialize, Serialize};

/// Canonical profile of the user a token belongs to, as returned by
/// `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GitHubUser {
    /// Account login (e.g. `octocat`).
    pub login: String,
    /// Avatar image URL.
    pub avatar_url: String,
    /// Profile page URL.
    pub html_url: String,
}
