//! Session status and sign-out modes.

use std::io::{self, Write};

use diffscope::AppError;

use super::SessionRuntime;
use super::output::{io_error, write_session_to};

/// Verifies the saved token, if any, and reports the session.
///
/// # Errors
///
/// Returns an error if writing output fails.
pub async fn run(runtime: &SessionRuntime) -> Result<(), AppError> {
    let session = runtime.controller.start(None).await;
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    write_session_to(&mut writer, &session)
}

/// Removes the saved token.
///
/// # Errors
///
/// Returns an error if the token cannot be removed or writing output fails.
pub fn run_logout(runtime: &SessionRuntime) -> Result<(), AppError> {
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    logout_with_writer(&mut writer, runtime)
}

fn logout_with_writer<W: Write>(writer: &mut W, runtime: &SessionRuntime) -> Result<(), AppError> {
    runtime.controller.sign_out()?;
    writeln!(writer, "Signed out.").map_err(|error| io_error(&error))
}
