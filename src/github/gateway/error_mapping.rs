//! Error mapping helpers for the Octocrab diff gateway.

use http::StatusCode;

use crate::review::ReviewError;

/// Checks if a GitHub error status indicates an authentication failure.
pub(super) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Checks if an octocrab error represents a network/transport issue.
pub(super) const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

/// Maps a transport-level Octocrab failure into a review error.
pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> ReviewError {
    if let octocrab::Error::GitHub { source, .. } = error {
        return map_http_error(source.status_code, Some(source.message.clone()));
    }

    if is_network_error(error) {
        return ReviewError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    ReviewError::UpstreamError {
        status: None,
        message: format!("{operation} failed: {error}"),
    }
}

/// Maps a non-success diff response status into the review error taxonomy.
pub(super) fn map_http_error(status: StatusCode, maybe_message: Option<String>) -> ReviewError {
    let message = maybe_message.unwrap_or_else(|| "unknown error".to_owned());
    if status == StatusCode::NOT_FOUND {
        ReviewError::NotFoundOrPrivate {
            status: status.as_u16(),
        }
    } else if is_auth_failure(status) {
        ReviewError::AuthorizationFailed {
            status: status.as_u16(),
            message,
        }
    } else {
        ReviewError::UpstreamError {
            status: Some(status.as_u16()),
            message,
        }
    }
}
