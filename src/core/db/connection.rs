/// Connection Management Module
///
/// This module wraps a live SQLite session. The caller owns the session for
/// its whole lifetime; the access layer only reads through it and never
/// closes it except through an explicit `disconnect` call made by the caller.

use crate::core::db::query::QueryExecutor;
use crate::core::db::schema::{self, Catalog};
use crate::core::{DalError, Result};
use crate::table::ResultTable;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// How the underlying session was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// A live session to a queryable relational engine
#[derive(Debug)]
pub struct RelationalConnection {
    /// Active database connection
    connection: Connection,
    /// Path to the database file (None for in-memory databases)
    path: Option<String>,
    mode: AccessMode,
}

impl RelationalConnection {
    /// Opens (or creates) a SQLite database at the specified path
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the SQLite database file, or ":memory:" for in-memory database
    ///
    /// # Returns
    ///
    /// The open session on success, `DalError::Database` on failure.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let connection = Connection::open(path)?;
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;

        let display = path.to_string_lossy().to_string();
        Ok(RelationalConnection {
            connection,
            path: if display != ":memory:" { Some(display) } else { None },
            mode: AccessMode::ReadWrite,
        })
    }

    /// Opens an existing database file without write access
    pub fn open_read_only<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
        )?;

        Ok(RelationalConnection {
            connection,
            path: Some(path.to_string_lossy().to_string()),
            mode: AccessMode::ReadOnly,
        })
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_rusqlite(Connection::open_in_memory()?))
    }

    /// Wraps a session opened elsewhere
    pub fn from_rusqlite(connection: Connection) -> Self {
        let mode = if connection.is_readonly(rusqlite::DatabaseName::Main).unwrap_or(false) {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };
        let path = connection.path().filter(|p| !p.is_empty()).map(|p| p.to_string());
        RelationalConnection { connection, path, mode }
    }

    /// Gets the database path (if any)
    ///
    /// # Returns
    ///
    /// `Some(path)` for file databases, `None` for in-memory databases.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// The native session handle
    pub fn raw(&self) -> &Connection {
        &self.connection
    }

    /// Executes a statement synchronously and materializes its rows
    pub fn query(&self, sql: &str) -> Result<ResultTable> {
        QueryExecutor::new(&self.connection).execute(sql)
    }

    /// Checks whether the engine's catalog holds a table or view of this name
    pub fn has_table(&self, name: &str) -> Result<bool> {
        schema::table_exists(&self.connection, name)
    }

    /// Introspects every table and view
    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::from_connection(&self.connection)
    }

    /// Closes the session. Only ever called by the owner.
    pub fn disconnect(self) -> Result<()> {
        self.connection
            .close()
            .map_err(|(_, e)| DalError::Database(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_in_memory_connection() {
        let conn = RelationalConnection::open_in_memory().unwrap();
        assert_eq!(conn.path(), None);
        assert_eq!(conn.mode(), AccessMode::ReadWrite);

        conn.raw().execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);").unwrap();
        assert!(conn.has_table("t").unwrap());
        assert_eq!(conn.query("SELECT * FROM t").unwrap().row_count(), 1);
        conn.disconnect().unwrap();
    }

    #[test]
    fn test_read_only_connection_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ro.sqlite");
        {
            let conn = RelationalConnection::open(&path).unwrap();
            conn.raw().execute_batch("CREATE TABLE t (id INTEGER);").unwrap();
            conn.disconnect().unwrap();
        }

        let conn = RelationalConnection::open_read_only(&path).unwrap();
        assert_eq!(conn.mode(), AccessMode::ReadOnly);
        assert!(conn.path().unwrap().ends_with("ro.sqlite"));
        assert!(conn.raw().execute("INSERT INTO t VALUES (1)", []).is_err());
        assert_eq!(conn.catalog().unwrap().names(), vec!["t"]);
    }

    #[test]
    fn test_connection_error_handling() {
        let result = RelationalConnection::open("/nonexistent/path/database.db");
        match result.unwrap_err() {
            DalError::Database(_) => {} // Expected
            _ => panic!("Expected Database error"),
        }

        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.sqlite");
        assert!(RelationalConnection::open_read_only(&missing).is_err());
    }
}
