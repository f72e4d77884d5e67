//! Personal access token sign-in mode.

use std::io::{self, Write};

use diffscope::AppError;

use super::SessionRuntime;
use super::output::{io_error, write_session_to};

/// Saves and verifies `raw_token`, then reports the session.
///
/// # Errors
///
/// Returns an error if the token is blank, rejected by GitHub, cannot be
/// saved, or writing output fails.
pub async fn run(runtime: &SessionRuntime, raw_token: &str) -> Result<(), AppError> {
    let mut buffer = Vec::new();
    sign_in_with_writer(&mut buffer, runtime, raw_token).await?;
    io::stdout()
        .lock()
        .write_all(&buffer)
        .map_err(|error| io_error(&error))
}

async fn sign_in_with_writer<W: Write>(
    writer: &mut W,
    runtime: &SessionRuntime,
    raw_token: &str,
) -> Result<(), AppError> {
    runtime.controller.sign_in_with_token(raw_token).await?;
    write_session_to(writer, &runtime.controller.current())
}
