#![warn(missing_docs, missing_debug_implementations)]

//! Refuse to release a version that is already on crates.io.
//!
//! The current package version is read from a [`VersionProvider`]
//! (normally `cargo metadata`), then the registry's per-version endpoint is
//! queried once. Only a `404 Not Found` means the version is still free; any
//! other status is treated as "already published" so the check fails closed.
//! Transport failures are reported separately so a flaky network is never
//! mistaken for a confirmed publication.
//!
//! # Example
//!
//! ```no_run
//! use version_bump_check::check::{Client, Registry, check_not_published};
//! use version_bump_check::version::CargoMetadata;
//!
//! let client = Client::new();
//! let registry = Registry::crates_io();
//! let provider = CargoMetadata::new(None, "closure-ffi");
//! match check_not_published(&client, &registry, "closure-ffi", &provider) {
//!     Ok(report) if report.is_published() => println!("error: {report}"),
//!     Ok(_) => {}
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! ```
//!
//! [`VersionProvider`]: version::VersionProvider

pub mod check;
pub mod version;
