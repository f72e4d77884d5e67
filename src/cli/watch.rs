//! Watch mode: follow session changes made by other processes.
//!
//! Another `diffscope` process signing in or out writes the shared state
//! directory; this mode polls it, re-verifies new tokens, and prints every
//! session transition until interrupted.

use std::io::{self, Write};
use std::time::Duration;

use diffscope::auth::storage::TOKEN_KEY;
use diffscope::{AppError, DiffscopeConfig, Session, SessionController};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::SessionRuntime;
use super::output::{io_error, write_notice_to, write_session_to};

/// Prints the session, then every change to it until Ctrl-C.
///
/// # Errors
///
/// Returns an error if writing output fails.
pub async fn run(config: &DiffscopeConfig, runtime: &SessionRuntime) -> Result<(), AppError> {
    let interval = config.sync_poll_interval()?;
    let mut stdout = io::stdout();
    let (session, watcher, sync) = start_following(runtime, interval).await;
    write_session_to(&mut stdout, &session)?;

    let followed = tokio::select! {
        result = follow(&mut stdout, &runtime.controller) => result,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };

    watcher.abort();
    sync.abort();
    followed
}

/// Runs the startup check, then starts the storage watcher and the sync
/// loop.
///
/// The token read during startup is the watcher's baseline, so a removal
/// that lands while startup is still verifying is published on the first
/// poll.
async fn start_following(
    runtime: &SessionRuntime,
    interval: Duration,
) -> (Session, JoinHandle<()>, JoinHandle<()>) {
    let sync = runtime.controller.spawn_sync();
    let session = runtime.controller.start(None).await;
    let watcher = runtime
        .hub
        .spawn_external_watcher(vec![TOKEN_KEY.to_owned()], interval);
    (session, watcher, sync)
}

/// Writes session transitions and notices as they are published.
///
/// Returns when the controller is dropped.
async fn follow<W: Write>(writer: &mut W, controller: &SessionController) -> Result<(), AppError> {
    let mut sessions = controller.subscribe();
    let mut notices = controller.notices();

    loop {
        tokio::select! {
            changed = sessions.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let session = sessions.borrow_and_update().clone();
                write_session_to(writer, &session)?;
            }
            notice = notices.recv() => match notice {
                Ok(received) => write_notice_to(writer, &received)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "session notices lagged");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
        writer.flush().map_err(|error| io_error(&error))?;
    }
}
