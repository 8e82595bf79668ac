//! Registry lookup deciding whether a package version is already published.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use ureq::Agent;
use ureq::http::Uri;

use crate::version::{VersionError, VersionProvider};

/// Base URL of the crates.io registry.
pub const CRATES_IO_URL: &str = "https://crates.io";

/// Package checked when no other name is configured.
pub const DEFAULT_PACKAGE: &str = "closure-ffi";

/// Timeout applied to the whole request when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether the registry already knows a version.
///
/// Only an HTTP 404 counts as unpublished. Every other status, including
/// client and server errors, is taken as published so the check fails closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
#[must_use]
#[non_exhaustive]
pub enum Publication {
    /// The registry answered 404: the version is free to publish.
    Unpublished,
    /// The registry answered with anything other than 404.
    Published {
        /// HTTP status code returned by the registry.
        status: u16,
    },
}

impl Publication {
    /// Classify a registry status code.
    ///
    /// ```
    /// use version_bump_check::check::Publication;
    /// assert_eq!(Publication::from_status(404), Publication::Unpublished);
    /// assert!(Publication::from_status(410).is_published());
    /// ```
    pub fn from_status(status: u16) -> Self {
        if status == 404 {
            Self::Unpublished
        } else {
            Self::Published { status }
        }
    }

    /// `true` unless the registry answered 404.
    #[must_use]
    pub fn is_published(self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Outcome of one check: which version was looked up where, and the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Package name as sent to the registry.
    pub package: String,
    /// Version identifier reported by the version provider.
    pub version: String,
    /// Display name of the registry that was queried.
    pub registry: String,
    /// The registry's answer.
    #[serde(flatten)]
    pub publication: Publication,
}

impl Report {
    /// `true` if the version already exists on the registry.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.publication.is_published()
    }

    /// Process exit code for this outcome: 0 when unpublished, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(self.is_published())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            package,
            version,
            registry,
            publication,
        } = self;
        match publication {
            Publication::Published { .. } => {
                write!(f, "{package} {version} already exists on {registry}")
            }
            Publication::Unpublished => {
                write!(f, "{package} {version} is not yet published on {registry}")
            }
        }
    }
}

/// Errors that prevent the check from reaching a verdict.
///
/// None of these mean the version is published; they mean the answer is
/// unknown.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckError {
    /// The package name cannot be a crates.io crate name.
    #[error("invalid package name `{name}`: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Which rule it broke.
        reason: &'static str,
    },
    /// The version provider failed.
    #[error("could not read package version: {0}")]
    Version(#[from] VersionError),
    /// The registry could not be reached or sent an unreadable response.
    #[error("could not query {registry} for {package} {version}: {source}")]
    Transport {
        /// Display name of the registry.
        registry: String,
        /// Package being checked.
        package: String,
        /// Version being checked.
        version: String,
        /// Underlying HTTP client error.
        #[source]
        source: Box<ureq::Error>,
    },
}

impl CheckError {
    /// Process exit code for a check that could not complete.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        2
    }
}

/// A registry URL that cannot be queried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InvalidRegistry {
    /// The URL does not parse.
    #[error("invalid registry url `{url}`: {source}")]
    Parse {
        /// The rejected URL.
        url: String,
        /// Parser error.
        #[source]
        source: ureq::http::uri::InvalidUri,
    },
    /// The URL is not an absolute `http` or `https` URL with a host.
    #[error("registry url `{url}` must be an absolute http(s) url")]
    NotHttp {
        /// The rejected URL.
        url: String,
    },
}

/// The registry to query, with the name used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    base_url: String,
    display_name: String,
}

impl Registry {
    /// The public crates.io registry.
    #[must_use]
    pub fn crates_io() -> Self {
        Self {
            base_url: CRATES_IO_URL.to_string(),
            display_name: "crates.io".to_string(),
        }
    }

    /// A registry serving the crates.io API at `base_url`.
    ///
    /// The display name is the URL's host, plus the port when one is given.
    ///
    /// ```
    /// use version_bump_check::check::Registry;
    /// let registry = Registry::new("http://127.0.0.1:8080/").unwrap();
    /// assert_eq!(registry.display_name(), "127.0.0.1:8080");
    /// assert_eq!(Registry::new("https://crates.io").unwrap(), Registry::crates_io());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRegistry`] if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, InvalidRegistry> {
        let uri: Uri = base_url.parse().map_err(|source| InvalidRegistry::Parse {
            url: base_url.to_string(),
            source,
        })?;

        let scheme_ok = matches!(uri.scheme_str(), Some("http" | "https"));
        let Some(authority) = uri.authority().filter(|_| scheme_ok) else {
            return Err(InvalidRegistry::NotHttp {
                url: base_url.to_string(),
            });
        };

        let display_name = match authority.port_u16() {
            Some(port) => format!("{}:{port}", authority.host()),
            None => authority.host().to_string(),
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            display_name,
        })
    }

    /// Name shown in diagnostics, e.g. `crates.io`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Per-version metadata endpoint for `package` at `version`.
    #[must_use]
    pub fn version_url(&self, package: &str, version: &str) -> String {
        format!("{}/api/v1/crates/{package}/{version}", self.base_url)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::crates_io()
    }
}

/// An HTTP client configured for registry queries.
///
/// Error statuses come back as ordinary responses so that every status
/// code, not just 404, reaches [`Publication::from_status`].
#[derive(Debug, Clone)]
pub struct Client {
    agent: Agent,
}

impl Client {
    /// Create a client with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        // crates.io rejects requests without a descriptive user agent
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION"),
                " (",
                env!("CARGO_PKG_REPOSITORY"),
                ")"
            ))
            .build();
        Self {
            agent: Agent::new_with_config(config),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_package_name(name: &str) -> Result<(), CheckError> {
    let reason = if name.is_empty() {
        "name cannot be empty"
    } else if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        "the first character must be an ASCII letter"
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        "characters must be ASCII alphanumeric, `-`, or `_`"
    } else {
        return Ok(());
    };
    Err(CheckError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// Check that the provider's current version of `package` is not yet on
/// `registry`.
///
/// Reads the version once, then issues a single GET to
/// `/api/v1/crates/{package}/{version}`. No retries are attempted.
///
/// # Errors
///
/// Returns [`CheckError::InvalidName`] for a malformed package name,
/// [`CheckError::Version`] if the provider fails, or
/// [`CheckError::Transport`] if the registry cannot be queried.
///
/// # Example
///
/// ```no_run
/// use version_bump_check::check::{Client, Registry, check_not_published};
/// use version_bump_check::version::Fixed;
///
/// let client = Client::new();
/// let report = check_not_published(
///     &client,
///     &Registry::crates_io(),
///     "closure-ffi",
///     &Fixed("1.2.3".into()),
/// )?;
/// std::process::exit(report.exit_code().into());
/// # Ok::<(), version_bump_check::check::CheckError>(())
/// ```
pub fn check_not_published<P>(
    client: &Client,
    registry: &Registry,
    package: &str,
    provider: &P,
) -> Result<Report, CheckError>
where
    P: VersionProvider + ?Sized,
{
    validate_package_name(package)?;
    let version = provider.version()?;

    let url = registry.version_url(package, &version);
    debug!(%url, "querying registry");

    let response = match client.agent.get(&url).call() {
        Ok(response) => response,
        Err(e) => {
            return Err(CheckError::Transport {
                registry: registry.display_name().to_string(),
                package: package.to_string(),
                version,
                source: Box::new(e),
            });
        }
    };

    let status = response.status().as_u16();
    let publication = Publication::from_status(status);
    info!(package, %version, status, published = publication.is_published(), "registry answered");

    Ok(Report {
        package: package.to_string(),
        version,
        registry: registry.display_name().to_string(),
        publication,
    })
}
