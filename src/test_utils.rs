/// # Test Utilities Module
///
/// Shared fixtures for the unit tests:
/// - An in-memory sample database and its on-disk fixture twin
/// - The same sample data as an accessor bundle
/// - A recording log sink
/// - DalError assertion macro

use crate::connection::{AccessorBundle, Connection};
use crate::core::db::RelationalConnection;
use crate::core::Result;
use crate::diagnostics::{LogLevel, LogSink};
use crate::table::{Dataset, ResultTable, Value};
use std::path::Path;
use std::sync::Mutex;

/// Sample schema: three customers, six sales rows stored under a suffixed
/// name and two orders stored under a prefixed name.
pub const SAMPLE_SQL: &str = "
    CREATE TABLE customer_profile (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );
    INSERT INTO customer_profile VALUES (1, 'Ann'), (2, 'Ben'), (3, 'Cai');

    CREATE TABLE sales_dta (
        id INTEGER PRIMARY KEY,
        region TEXT NOT NULL,
        qty INTEGER NOT NULL
    );
    INSERT INTO sales_dta VALUES
        (1, 'north', 1), (2, 'south', 2), (3, 'north', 3),
        (4, 'south', 4), (5, 'north', 5), (6, 'south', 6);

    CREATE TABLE df_orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL,
        total REAL NOT NULL
    );
    INSERT INTO df_orders VALUES (1, 1, 19.5), (2, 3, 5.25);
";

/// Isolated in-memory database fixture
pub struct DatabaseFixture {
    pub name: String,
    pub connection: RelationalConnection,
}

impl DatabaseFixture {
    /// Create a new empty test database
    pub fn new(name: &str) -> Result<Self> {
        Ok(DatabaseFixture {
            name: name.to_string(),
            connection: RelationalConnection::open_in_memory()?,
        })
    }

    /// Create fixture with the sample schema and data
    pub fn with_sample_data(name: &str) -> Result<Self> {
        let fixture = Self::new(name)?;
        fixture.connection.raw().execute_batch(SAMPLE_SQL)?;
        Ok(fixture)
    }

    pub fn into_connection(self) -> Connection {
        Connection::Relational(self.connection)
    }
}

/// Writes the sample data plus fixture metadata to a SQLite file.
pub fn write_sample_fixture(path: &Path) -> Result<()> {
    let conn = RelationalConnection::open(path)?;
    conn.raw().execute_batch(SAMPLE_SQL)?;
    conn.raw().execute_batch(
        "CREATE TABLE _fixture_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
         INSERT INTO _fixture_meta VALUES ('name', 'sample'), ('version', '1');",
    )?;
    conn.disconnect()
}

pub fn customer_profile_table() -> ResultTable {
    ResultTable::from_rows(
        vec!["id".into(), "name".into()],
        vec![
            vec![1.into(), "Ann".into()],
            vec![2.into(), "Ben".into()],
            vec![3.into(), "Cai".into()],
        ],
    )
    .expect("sample table is well formed")
}

/// The sample data held in memory, one table literal and one row set.
pub fn sample_bundle() -> AccessorBundle {
    let sales: Vec<Vec<Value>> = (1..=6)
        .map(|i: i64| {
            let region = if i % 2 == 1 { "north" } else { "south" };
            vec![Value::Integer(i), Value::from(region), Value::Integer(i)]
        })
        .collect();

    AccessorBundle::new()
        .with_table("customer_profile", customer_profile_table())
        .with_table(
            "sales_dta",
            Dataset::Rows {
                columns: vec!["id".into(), "region".into(), "qty".into()],
                rows: sales,
            },
        )
}

/// Log sink that keeps every record for inspection
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn contains(&self, level: LogLevel, fragment: &str) -> bool {
        self.records()
            .iter()
            .any(|(l, message)| *l == level && message.contains(fragment))
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

impl LogSink for RecordingSink {
    fn write(&self, level: LogLevel, message: &str) -> Result<()> {
        if let Ok(mut records) = self.records.lock() {
            records.push((level, message.to_string()));
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! assert_dal_error {
    ($result:expr, $expected_type:ident, $context:expr) => {
        match $result {
            Err($crate::core::DalError::$expected_type(_)) => {},
            Ok(value) => panic!("Expected {} error but got Ok({:?}) in {}", stringify!($expected_type), value, $context),
            Err(other) => panic!("Expected {} but got {:?} in {}", stringify!($expected_type), other, $context),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_fixture_creation() {
        let fixture = DatabaseFixture::with_sample_data("test_sample").unwrap();
        assert_eq!(fixture.name, "test_sample");

        let count: i64 = fixture
            .connection
            .raw()
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type='table'", [], |row| row.get(0))
            .expect("Failed to count tables");

        assert_eq!(count, 3, "Should have created the three sample tables");
    }

    #[test]
    fn test_bundle_matches_database() {
        let fixture = DatabaseFixture::with_sample_data("test_twin").unwrap();
        let from_db = fixture.connection.query("SELECT * FROM sales_dta").unwrap();
        let bundle = sample_bundle();
        let from_bundle = bundle.get("sales_dta").unwrap().call("sales_dta").unwrap().unwrap().into_table().unwrap();
        assert_eq!(from_db, from_bundle);
    }

    #[test]
    fn test_error_assertion_macro() {
        let result: Result<i32> = Err(crate::core::DalError::Combine("Test error".to_string()));
        assert_dal_error!(result, Combine, "macro test");
    }
}
