//! URL parsing and identity wrappers for pull request review.

use std::borrow::Cow;

use url::Url;

use super::error::LocatorError;

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    pub(crate) fn new(value: &str) -> Result<Self, LocatorError> {
        if value.is_empty() {
            return Err(LocatorError::MissingPathSegments);
        }
        Ok(Self(value.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub(crate) fn new(value: &str) -> Result<Self, LocatorError> {
        if value.is_empty() {
            return Err(LocatorError::MissingPathSegments);
        }
        Ok(Self(value.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Pull request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    pub(crate) const fn new(value: u64) -> Result<Self, LocatorError> {
        if value == 0 {
            return Err(LocatorError::InvalidPullRequestNumber);
        }
        Ok(Self(value))
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

const PUBLIC_HOSTS: [&str; 2] = ["github.com", "www.github.com"];

/// Prefixes `https://` when the input starts with a host name but no scheme,
/// as in `github.com/owner/repo/pull/1`.
fn with_default_scheme(input: &str) -> Cow<'_, str> {
    let starts_with_host = !input.contains("://")
        && input
            .split('/')
            .next()
            .is_some_and(|host| host.contains('.'));
    if starts_with_host {
        Cow::Owned(format!("https://{input}"))
    } else {
        Cow::Borrowed(input)
    }
}

/// Derives the GitHub API base URL from a parsed pull request URL.
///
/// `github.com` and `www.github.com` map to the public API; any other host is
/// treated as GitHub Enterprise and served from `/api/v3` on the same
/// authority.
fn derive_api_base(parsed: &Url) -> Result<Url, LocatorError> {
    let host = parsed
        .host_str()
        .ok_or_else(|| LocatorError::InvalidUrl("URL must include a host".to_owned()))?;

    if PUBLIC_HOSTS
        .iter()
        .any(|public| host.eq_ignore_ascii_case(public))
    {
        return Url::parse("https://api.github.com")
            .map_err(|error| LocatorError::InvalidUrl(error.to_string()));
    }

    let authority = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_owned()
    };
    let mut api_url = Url::parse(&format!("{}://{authority}", parsed.scheme()))
        .map_err(|error| LocatorError::InvalidUrl(error.to_string()))?;

    api_url
        .set_port(parsed.port())
        .map_err(|()| LocatorError::InvalidUrl("invalid port".to_owned()))?;
    api_url.set_path("api/v3");
    Ok(api_url)
}

/// Parsed pull request URL and derived API base.
///
/// Immutable once parsed; every accessor borrows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestLocator {
    api_base: Url,
    owner: RepositoryOwner,
    repository: RepositoryName,
    number: PullRequestNumber,
}

impl PullRequestLocator {
    /// Parses a GitHub pull request URL in the form
    /// `https://github.com/<owner>/<repo>/pull/<number>`.
    ///
    /// Trailing segments such as `/files` are accepted and ignored, as is
    /// surrounding whitespace. A missing scheme defaults to `https`.
    ///
    /// # Errors
    ///
    /// Returns `LocatorError::InvalidUrl` when parsing fails,
    /// `MissingPathSegments` when the URL path is not
    /// `/owner/repo/pull/<number>`, and `InvalidPullRequestNumber` when the
    /// number segment is not a positive integer.
    ///
    /// # Example
    ///
    /// ```
    /// use diffscope::PullRequestLocator;
    ///
    /// let locator = PullRequestLocator::parse("https://github.com/acme/widgets/pull/42")
    ///     .expect("should parse pull request URL");
    /// assert_eq!(locator.owner().as_str(), "acme");
    /// assert_eq!(locator.number().get(), 42);
    /// ```
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let parsed = Url::parse(&with_default_scheme(input.trim()))
            .map_err(|error| LocatorError::InvalidUrl(error.to_string()))?;

        let mut segments = parsed
            .path_segments()
            .ok_or(LocatorError::MissingPathSegments)?;

        let owner_segment = segments.next().ok_or(LocatorError::MissingPathSegments)?;
        let repository_segment = segments.next().ok_or(LocatorError::MissingPathSegments)?;
        let marker = segments.next().ok_or(LocatorError::MissingPathSegments)?;
        let number_segment = segments.next().ok_or(LocatorError::MissingPathSegments)?;

        if marker != "pull" || number_segment.is_empty() {
            return Err(LocatorError::MissingPathSegments);
        }

        let owner = RepositoryOwner::new(owner_segment)?;
        let repository = RepositoryName::new(repository_segment)?;
        let number = number_segment
            .parse::<u64>()
            .map_err(|_| LocatorError::InvalidPullRequestNumber)
            .and_then(PullRequestNumber::new)?;

        let api_base = derive_api_base(&parsed)?;

        Ok(Self {
            api_base,
            owner,
            repository,
            number,
        })
    }

    /// API base URL derived from the pull request host.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    pub(crate) fn pull_request_path(&self) -> String {
        format!(
            "/repos/{}/{}/pulls/{}",
            self.owner.as_str(),
            self.repository.as_str(),
            self.number.get()
        )
    }
}
