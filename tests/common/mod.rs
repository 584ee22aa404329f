//! Shared setup for the integration tests: an on-disk fixture store seeded
//! with the sample datasets.

#![allow(dead_code)]

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SEED_SQL: &str = "
    CREATE TABLE customer_profile (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    INSERT INTO customer_profile VALUES (1, 'Ann'), (2, 'Ben'), (3, 'Cai');

    CREATE TABLE sales_dta (id INTEGER PRIMARY KEY, region TEXT NOT NULL, qty INTEGER NOT NULL);
    INSERT INTO sales_dta VALUES
        (1, 'north', 1), (2, 'south', 2), (3, 'north', 3),
        (4, 'south', 4), (5, 'north', 5), (6, 'south', 6);

    CREATE TABLE df_orders (id INTEGER PRIMARY KEY, customer_id INTEGER NOT NULL, total REAL NOT NULL);
    INSERT INTO df_orders VALUES (1, 1, 19.5), (2, 3, 5.25);

    CREATE TABLE _fixture_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
    INSERT INTO _fixture_meta VALUES ('name', 'integration'), ('version', '2');
";

/// Dataset names every test sweeps over, including one that matches nothing.
pub const DATASETS: [&str; 6] = ["customer_profile", "sales", "sales_dta", "orders", "df_orders", "absent"];

pub fn seed(path: &Path) {
    let conn = Connection::open(path).expect("Failed to create fixture");
    conn.execute_batch(SEED_SQL).expect("Failed to seed fixture");
}

/// A temporary directory holding a seeded fixture. Keep the `TempDir`
/// alive for as long as the path is used.
pub fn fixture() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("mock_data.sqlite");
    seed(&path);
    (dir, path)
}
