/// Schema Introspection Module
///
/// This module enumerates the tables and views of a SQLite session and
/// their columns. The catalog drives dataset-name resolution and the mock
/// factory's table enumeration.

use crate::core::Result;
use rusqlite::{Connection, Row};

/// Represents a database column with its metadata
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared SQLite type name (e.g., "INTEGER", "TEXT"); empty when undeclared
    pub type_name: String,
    /// Whether the column is declared NOT NULL
    pub notnull: bool,
}

impl Column {
    /// Creates a Column from a PRAGMA table_info result row
    fn from_pragma_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Column {
            name: row.get(1)?,
            type_name: row.get(2)?,
            notnull: row.get(3)?,
        })
    }
}

/// A table or view known to the engine
#[derive(Debug, Clone)]
pub struct Table {
    /// Table name
    pub name: String,
    /// List of columns in this table
    pub columns: Vec<Column>,
}

/// The tables and views of one session, sorted by name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub tables: Vec<Table>,
}

impl Catalog {
    /// Creates a catalog by introspecting all user tables and views
    pub fn from_connection(conn: &Connection) -> Result<Self> {
        let mut tables = Vec::new();
        for name in table_names(conn)? {
            let columns = get_table_columns(conn, &name)?;
            tables.push(Table { name, columns });
        }
        Ok(Catalog { tables })
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Returns the names of all user tables and views, sorted
pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Checks whether a table or view with exactly this name exists
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
    )?;
    Ok(stmt.exists([name])?)
}

/// Helper function to retrieve column information for a specific table
fn get_table_columns(conn: &Connection, table_name: &str) -> Result<Vec<Column>> {
    let mut stmt = conn.prepare("SELECT * FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table_name], |row| Column::from_pragma_row(row))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}
