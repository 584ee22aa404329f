/// Query Execution Module
///
/// This module executes SQL against a SQLite session and materializes the
/// rows into a typed `ResultTable`.

use crate::core::{DalError, Result};
use crate::table::{Column, ResultTable, Value};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;

/// Query execution service that operates on a database connection
pub struct QueryExecutor<'a> {
    connection: &'a Connection,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new QueryExecutor for the given connection
    pub fn new(connection: &'a Connection) -> Self {
        QueryExecutor { connection }
    }

    /// Executes a SQL query and returns its rows as a result table
    ///
    /// # Arguments
    ///
    /// * `sql` - The SQL query to execute
    ///
    /// # Errors
    ///
    /// Returns `DalError::Query` if the statement cannot be prepared or run,
    /// and `DalError::DataShape` if a column mixes incompatible storage classes.
    pub fn execute(&self, sql: &str) -> Result<ResultTable> {
        let mut stmt = self
            .connection
            .prepare(sql)
            .map_err(|e| DalError::Query(format!("Failed to prepare statement: {}", e)))?;

        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    values.push(to_value(row.get_ref(i)?));
                }
                Ok(values)
            })
            .map_err(|e| DalError::Query(format!("Query execution failed: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DalError::Query(format!("Result processing failed: {}", e)))?;

        let mut buckets: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); column_count];
        for row in rows {
            for (bucket, value) in buckets.iter_mut().zip(row) {
                bucket.push(value);
            }
        }

        ResultTable::new(
            names
                .into_iter()
                .zip(buckets)
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        )
    }
}

/// Quotes an identifier for safe use as a table or column name.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Binds a cell value as a statement parameter, keeping its storage class.
impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(r) => ValueRef::Real(*r),
            Value::Text(t) => ValueRef::Text(t.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        }))
    }
}

fn to_value(value: ValueRef) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_test_table(conn: &Connection) {
        conn.execute_batch(
            "
            CREATE TABLE test (
                id INTEGER PRIMARY KEY,
                name TEXT,
                value REAL
            );
            INSERT INTO test (name, value) VALUES ('Alice', 123.45);
            INSERT INTO test (name, value) VALUES ('Bob', 678.90);
            INSERT INTO test (name, value) VALUES (NULL, NULL);
        "
        ).unwrap();
    }

    #[test]
    fn test_query_execution() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let executor = QueryExecutor::new(&conn);
        let result = executor.execute("SELECT * FROM test ORDER BY id").unwrap();

        assert_eq!(result.column_names(), vec!["id", "name", "value"]);
        assert_eq!(result.row_count(), 3);

        assert_eq!(
            result.row(0).unwrap(),
            vec![&Value::Integer(1), &Value::from("Alice"), &Value::Real(123.45)]
        );
        assert_eq!(result.row(2).unwrap(), vec![&Value::Integer(3), &Value::Null, &Value::Null]);
    }

    #[test]
    fn test_empty_result_keeps_columns() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let result = QueryExecutor::new(&conn).execute("SELECT id, name FROM test WHERE id > 99").unwrap();
        assert_eq!(result.column_names(), vec!["id", "name"]);
        assert_eq!(result.row_count(), 0);
    }

    #[test]
    fn test_query_error_handling() {
        let conn = Connection::open_in_memory().unwrap();

        let executor = QueryExecutor::new(&conn);
        let result = executor.execute("SELECT * FROM nonexistent_table");

        match result.unwrap_err() {
            DalError::Query(msg) => assert!(msg.contains("no such table")),
            _ => panic!("Expected Query error"),
        }
    }

    #[test]
    fn test_blob_handling() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE blobs (id INTEGER, data BLOB)", []).unwrap();
        conn.execute("INSERT INTO blobs VALUES (1, X'48656C6C6F')", []).unwrap(); // "Hello" in hex

        let result = QueryExecutor::new(&conn).execute("SELECT data FROM blobs WHERE id = 1").unwrap();
        assert_eq!(result.row(0).unwrap(), vec![&Value::Blob(b"Hello".to_vec())]);
    }

    #[test]
    fn test_values_bind_with_their_storage_class() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE cells (v)", []).unwrap();
        let values = [
            Value::Null,
            Value::Integer(7),
            Value::Real(1.5),
            Value::from("seven"),
            Value::Blob(vec![0x07]),
        ];
        for value in &values {
            conn.execute("INSERT INTO cells VALUES (?1)", [value]).unwrap();
        }

        let stored: Vec<String> = conn
            .prepare("SELECT typeof(v) FROM cells ORDER BY rowid")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(stored, vec!["null", "integer", "real", "text", "blob"]);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("sales_dta"), "\"sales_dta\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }
}
