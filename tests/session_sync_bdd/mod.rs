//! Support modules for the session sync BDD tests.

#[path = "../support/runtime.rs"]
pub(crate) mod runtime;
pub(crate) mod state;

pub(crate) use runtime::ensure_runtime_and_server;
pub(crate) use state::{Process, SyncState, process, scenario_runtime, state_dir_path, stored_token};
