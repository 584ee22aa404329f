//! Fixture location from the environment. Kept in its own test binary since
//! it mutates process-wide state.

mod common;

use unidal::mock::{describe_fixture, MockFactory, FIXTURE_ENV};
use unidal::{fetch, Config, FetchOptions, MockKind};

#[test]
fn environment_overrides_configured_default() {
    let (_dir, path) = common::fixture();
    let config: Config = "[fixture]\npath = \"/nonexistent/fixture.sqlite\"".parse().unwrap();
    let factory = MockFactory::from_config(&config);

    std::env::remove_var(FIXTURE_ENV);
    assert!(factory.create(MockKind::Relational, None).is_err());

    std::env::set_var(FIXTURE_ENV, &path);
    assert_eq!(factory.fixture_path(None), path);
    let conn = factory.create(MockKind::Bundle, None).unwrap();
    let table = fetch(&conn, "orders", &FetchOptions::new()).unwrap().into_table().unwrap();
    assert_eq!(table.row_count(), 2);

    let info = describe_fixture(&path).unwrap();
    assert_eq!(info.name.as_deref(), Some("integration"));
    assert_eq!(info.version.as_deref(), Some("2"));

    std::env::remove_var(FIXTURE_ENV);
}
