//! Sources of truth for the version being released.

use std::path::PathBuf;

use cargo_metadata::MetadataCommand;
use thiserror::Error;
use tracing::debug;

/// Supplies the version string of the package under release.
///
/// The checker asks exactly once per run and treats the answer as
/// authoritative; the string is not parsed or validated.
pub trait VersionProvider {
    /// Return the current version identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`VersionError`] if the version cannot be determined.
    fn version(&self) -> Result<String, VersionError>;
}

/// Errors that can occur while reading the package version.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VersionError {
    /// `cargo metadata` could not be run or its output could not be parsed.
    #[error("cargo metadata failed: {0}")]
    Metadata(#[from] cargo_metadata::Error),
    /// No workspace member carries the requested package name.
    #[error("package `{package}` is not a member of the workspace")]
    PackageNotFound {
        /// The package name that was looked up.
        package: String,
    },
}

/// Reads the version of a workspace package from `cargo metadata`.
///
/// Only workspace members are considered, so a dependency that happens to
/// share the name is never picked up.
#[derive(Debug, Clone)]
pub struct CargoMetadata {
    manifest_path: Option<PathBuf>,
    package: String,
}

impl CargoMetadata {
    /// Look up `package` in the workspace containing `manifest_path`, or in
    /// the workspace cargo discovers from the current directory when `None`.
    #[must_use]
    pub fn new(manifest_path: Option<PathBuf>, package: &str) -> Self {
        Self {
            manifest_path,
            package: package.to_string(),
        }
    }
}

impl VersionProvider for CargoMetadata {
    fn version(&self) -> Result<String, VersionError> {
        let mut cmd = MetadataCommand::new();
        cmd.no_deps();
        if let Some(path) = &self.manifest_path {
            cmd.manifest_path(path);
        }
        let metadata = cmd.exec()?;

        let package = self.package.as_str();
        let found = metadata
            .workspace_packages()
            .into_iter()
            .find(|pkg| pkg.name == package)
            .ok_or_else(|| VersionError::PackageNotFound {
                package: self.package.clone(),
            })?;

        let version = found.version.to_string();
        debug!(package, %version, "read version from cargo metadata");
        Ok(version)
    }
}

/// A version fixed up front, e.g. from a command-line override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixed(pub String);

impl VersionProvider for Fixed {
    fn version(&self) -> Result<String, VersionError> {
        Ok(self.0.clone())
    }
}
