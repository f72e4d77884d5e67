//! Support modules for the pull request review BDD tests.

#[path = "../support/runtime.rs"]
pub(crate) mod runtime;
pub(crate) mod state;

pub(crate) use state::{
    AI_COMPLETIONS_PATH, ReviewState, github_diff_path, mount, review_pull_request, server_uri,
};
