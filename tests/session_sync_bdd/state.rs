//! Scenario state for the session sync BDD tests.
//!
//! Each simulated process owns its own storage hub and session controller
//! over the same state directory, exactly as two `diffscope` invocations
//! would.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use diffscope::auth::storage::{FileStorageBackend, StorageBackend, TOKEN_KEY};
use diffscope::auth::{BackendTokenExchanger, PkceStash};
use diffscope::{CredentialStore, GitHubTokenVerifier, Session, SessionController, StorageHub};
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use url::Url;
use wiremock::MockServer;

use super::runtime::SharedRuntime;

/// How long a process may take to settle after a change.
pub(crate) const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// One simulated `diffscope` process.
pub(crate) struct Process {
    pub(crate) hub: Arc<StorageHub>,
    pub(crate) controller: Arc<SessionController>,
    sync: JoinHandle<()>,
}

impl Drop for Process {
    fn drop(&mut self) {
        self.sync.abort();
    }
}

impl Process {
    /// Opens `state_dir` and starts following changes to the token.
    pub(crate) fn open(
        runtime: &SharedRuntime,
        state_dir: &Utf8PathBuf,
        github_api: &str,
    ) -> Result<Self, String> {
        let backend = FileStorageBackend::open(state_dir)
            .map_err(|error| format!("failed to open state directory: {error}"))?;
        let hub = StorageHub::new(Arc::new(backend));
        let stash = PkceStash::new(hub.open_handle());
        let backend_url = Url::parse("http://127.0.0.1:9/v1/auth/github")
            .map_err(|error| error.to_string())?;
        let redirect_uri =
            Url::parse("http://127.0.0.1:8976/").map_err(|error| error.to_string())?;
        let controller = Arc::new(SessionController::new(
            CredentialStore::new(hub.open_handle()),
            Arc::new(GitHubTokenVerifier::new(github_api)),
            Arc::new(BackendTokenExchanger::new(backend_url, redirect_uri, stash)),
        ));

        let sync = runtime.block_on(async {
            controller.start(None).await;
            controller.spawn_sync()
        });
        hub.poll_external_changes(&[TOKEN_KEY])
            .map_err(|error| format!("failed to record baseline: {error}"))?;

        Ok(Self {
            hub,
            controller,
            sync,
        })
    }

    /// Waits until the session satisfies `predicate`.
    pub(crate) fn wait_for(
        &self,
        runtime: &SharedRuntime,
        description: &str,
        predicate: impl FnMut(&Session) -> bool,
    ) -> Result<(), String> {
        let mut sessions = self.controller.subscribe();
        let settled = runtime.block_on(async {
            tokio::time::timeout(SETTLE_TIMEOUT, async {
                sessions.wait_for(predicate).await.map(|_| ())
            })
            .await
        });
        match settled {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err("session controller dropped".to_owned()),
            Err(_) => Err(format!(
                "process never became {description}; session is {}",
                self.controller.current().label()
            )),
        }
    }
}

#[derive(ScenarioState, Default)]
pub(crate) struct SyncState {
    pub(crate) runtime: Slot<SharedRuntime>,
    pub(crate) server: Slot<MockServer>,
    pub(crate) state_dir: Slot<Arc<TempDir>>,
    pub(crate) first: Slot<Arc<Process>>,
    pub(crate) second: Slot<Arc<Process>>,
}

/// Path of the shared state directory.
pub(crate) fn state_dir_path(sync_state: &SyncState) -> Result<Utf8PathBuf, String> {
    let dir = sync_state
        .state_dir
        .get()
        .ok_or_else(|| "state directory not created".to_owned())?;
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .map_err(|path| format!("state directory is not UTF-8: {}", path.display()))
}

/// Reads the token straight from the state directory.
pub(crate) fn stored_token(sync_state: &SyncState) -> Result<Option<String>, String> {
    let backend = FileStorageBackend::open(&state_dir_path(sync_state)?)
        .map_err(|error| error.to_string())?;
    backend.read(TOKEN_KEY).map_err(|error| error.to_string())
}

/// The runtime created by the first step.
pub(crate) fn scenario_runtime(sync_state: &SyncState) -> Result<SharedRuntime, String> {
    sync_state
        .runtime
        .get()
        .ok_or_else(|| "runtime not initialised".to_owned())
}

/// One of the two simulated processes.
pub(crate) fn process(slot: &Slot<Arc<Process>>) -> Result<Arc<Process>, String> {
    slot.get()
        .ok_or_else(|| "process not started".to_owned())
}
