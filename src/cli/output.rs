//! Output formatting utilities for CLI operations.

use std::io::{self, Write};

use diffscope::auth::{AuthReason, SessionNotice};
use diffscope::{AppError, ReviewResult, Session};

/// Writes a review report to the given writer.
///
/// Issues are listed from most to least severe.
pub fn write_review_to<W: Write>(writer: &mut W, review: &ReviewResult) -> Result<(), AppError> {
    writeln!(writer, "Overall score: {}/100", review.overall_score).map_err(|e| io_error(&e))?;
    writeln!(writer, "Summary: {}", review.summary).map_err(|e| io_error(&e))?;
    writeln!(writer, "Breakage risk: {}", review.breakage_risk).map_err(|e| io_error(&e))?;
    writeln!(writer).map_err(|e| io_error(&e))?;

    if review.issues.is_empty() {
        writeln!(writer, "Excellent! No issues found.").map_err(|e| io_error(&e))?;
        return Ok(());
    }

    writeln!(writer, "Identified issues ({}):", review.issues.len()).map_err(|e| io_error(&e))?;
    for issue in review.issues_by_severity() {
        writeln!(writer).map_err(|e| io_error(&e))?;
        writeln!(writer, "[{}] {}", issue.severity.label(), issue.file_path)
            .map_err(|e| io_error(&e))?;
        writeln!(writer, "  {}", issue.description).map_err(|e| io_error(&e))?;
        writeln!(writer, "  Suggestion: {}", issue.suggestion).map_err(|e| io_error(&e))?;
    }

    Ok(())
}

/// Writes a one-line description of the session to the given writer.
pub fn write_session_to<W: Write>(writer: &mut W, session: &Session) -> Result<(), AppError> {
    let line = match session {
        Session::SignedOut => {
            "Signed out. Sign in with --login or --token <TOKEN>.".to_owned()
        }
        Session::Authenticating(reason) => {
            let activity = match reason {
                AuthReason::Startup => "checking the saved token",
                AuthReason::OAuthCallback => "completing browser sign-in",
                AuthReason::ManualToken => "checking the entered token",
            };
            format!("Authenticating ({activity})...")
        }
        Session::SignedIn { user, .. } => {
            format!("Signed in as {} ({})", user.login, user.html_url)
        }
    };
    writeln!(writer, "{line}").map_err(|e| io_error(&e))
}

/// Writes a session notice to the given writer.
///
/// Dismissal notices have no terminal representation.
pub fn write_notice_to<W: Write>(writer: &mut W, notice: &SessionNotice) -> Result<(), AppError> {
    match notice {
        SessionNotice::PromptDismissed => Ok(()),
        SessionNotice::Error(message) => {
            writeln!(writer, "Sign-in failed: {message}").map_err(|e| io_error(&e))
        }
    }
}

/// Converts an I/O error to an [`AppError::Io`].
pub(crate) fn io_error(error: &io::Error) -> AppError {
    AppError::Io {
        message: error.to_string(),
    }
}
