//! Bearer token newtype.

use std::fmt;

use super::error::AuthError;

/// A GitHub bearer token (personal access token or OAuth access token).
///
/// The value is trimmed on construction and never empty. `Debug` output is
/// redacted so a token cannot reach logs through `{:?}` formatting.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a token from user or storage input.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingToken`] when the input is blank.
    pub fn new(value: impl AsRef<str>) -> Result<Self, AuthError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the raw token for use in an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("AccessToken(<redacted>)")
    }
}
