//! Shared HTTP utilities for GitHub requests.

use http::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

use crate::auth::AccessToken;

/// Media type that makes the pulls endpoint return a unified diff.
pub(crate) const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

/// Media type for regular JSON responses.
pub(crate) const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Builds request headers with the given `Accept` value and, when a token is
/// present, an `Authorization: token <t>` header marked as sensitive.
///
/// Returns `None` when the token contains bytes that cannot appear in a
/// header value.
pub(crate) fn request_headers(accept: &'static str, token: Option<&AccessToken>) -> Option<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(accept));

    if let Some(credential) = token {
        let mut value = HeaderValue::from_str(&format!("token {}", credential.expose())).ok()?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Some(headers)
}

/// Extracts the `message` field GitHub includes in JSON error bodies.
pub(crate) fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}
