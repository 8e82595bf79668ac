use std::cell::Cell;

use httpmock::prelude::*;
use version_bump_check::check::{
    CheckError, Client, DEFAULT_PACKAGE, Publication, Registry, check_not_published,
};
use version_bump_check::version::{Fixed, VersionError, VersionProvider};

/// Counts how often the checker asks for the version.
struct Counting {
    version: &'static str,
    calls: Cell<usize>,
}

impl VersionProvider for Counting {
    fn version(&self) -> Result<String, VersionError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.version.to_string())
    }
}

struct Missing;

impl VersionProvider for Missing {
    fn version(&self) -> Result<String, VersionError> {
        Err(VersionError::PackageNotFound {
            package: DEFAULT_PACKAGE.to_string(),
        })
    }
}

#[test]
fn public_api_scenario_unpublished() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/v1/crates/closure-ffi/1.2.3");
        then.status(404);
    });
    let registry = Registry::new(&server.base_url()).unwrap();

    let report = check_not_published(
        &Client::new(),
        &registry,
        DEFAULT_PACKAGE,
        &Fixed("1.2.3".into()),
    )
    .unwrap();
    mock.assert();
    assert!(!report.is_published());
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn public_api_scenario_published() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/crates/closure-ffi/1.2.3");
        then.status(200);
    });
    let registry = Registry::new(&server.base_url()).unwrap();

    let report = check_not_published(
        &Client::new(),
        &registry,
        DEFAULT_PACKAGE,
        &Fixed("1.2.3".into()),
    )
    .unwrap();
    assert_eq!(report.publication, Publication::Published { status: 200 });
    assert_eq!(report.exit_code(), 1);
    assert_eq!(
        report.to_string(),
        format!("closure-ffi 1.2.3 already exists on {}", server.address())
    );
}

#[test]
fn version_is_read_once_per_check() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/crates/closure-ffi/0.1.0");
        then.status(404);
    });
    let registry = Registry::new(&server.base_url()).unwrap();
    let provider = Counting {
        version: "0.1.0",
        calls: Cell::new(0),
    };

    check_not_published(&Client::new(), &registry, DEFAULT_PACKAGE, &provider).unwrap();
    assert_eq!(provider.calls.get(), 1);
}

#[test]
fn provider_failure_is_version_error() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.path_contains("/api/v1/crates/");
        then.status(404);
    });
    let registry = Registry::new(&server.base_url()).unwrap();

    match check_not_published(&Client::new(), &registry, DEFAULT_PACKAGE, &Missing) {
        Err(e @ CheckError::Version(_)) => {
            assert_eq!(e.exit_code(), 2);
            assert!(std::error::Error::source(&e).is_some());
        }
        other => panic!("expected Version error, got {other:?}"),
    }
    mock.assert_hits(0);
}

#[test]
fn trait_object_provider() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/crates/closure-ffi/3.0.0");
        then.status(404);
    });
    let registry = Registry::new(&server.base_url()).unwrap();
    let provider: Box<dyn VersionProvider> = Box::new(Fixed("3.0.0".into()));

    let report =
        check_not_published(&Client::new(), &registry, DEFAULT_PACKAGE, provider.as_ref())
            .unwrap();
    assert_eq!(report.version, "3.0.0");
}

#[test]
fn client_default_equals_new() {
    let _client: Client = Client::default();
}

#[test]
fn registry_default_is_crates_io() {
    assert_eq!(Registry::default(), Registry::crates_io());
    assert_eq!(Registry::default().display_name(), "crates.io");
}

#[test]
#[ignore] // requires network access
fn public_api_published_on_crates_io() {
    let report = check_not_published(
        &Client::new(),
        &Registry::crates_io(),
        "serde",
        &Fixed("1.0.100".into()),
    )
    .unwrap();
    assert!(report.is_published());
    assert_eq!(
        format!("error: {report}"),
        "error: serde 1.0.100 already exists on crates.io"
    );
}
