//! Reproducible test connections built from a fixture store.
//!
//! A fixture is a SQLite file with one table per dataset. The factory never
//! invents data: a missing fixture is a [`DalError::FixtureNotFound`].
//! Relational and bundle connections built from the same fixture answer every
//! request identically.

use crate::config::Config;
use crate::connection::{AccessorBundle, BundleEntry, Connection};
use crate::core::db::{quote_identifier, table_names, Catalog, RelationalConnection};
use crate::core::{DalError, Result};
use crate::diagnostics::Diagnostics;
use crate::resolve::NameResolver;
use crate::table::{Dataset, ResultTable};
use rusqlite::OptionalExtension;
use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

/// Where the fixture lives when neither the caller nor the environment says.
pub const DEFAULT_FIXTURE_PATH: &str = "fixtures/mock_data.sqlite";
/// Environment variable overriding the default fixture path.
pub const FIXTURE_ENV: &str = "UNIDAL_MOCK_FIXTURE";
/// Optional key/value table naming and versioning a fixture.
pub const FIXTURE_META_TABLE: &str = "_fixture_meta";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockKind {
    Relational,
    Bundle,
}

impl FromStr for MockKind {
    type Err = DalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relational" => Ok(MockKind::Relational),
            "bundle" => Ok(MockKind::Bundle),
            other => Err(DalError::Config(format!(
                "unknown mock connection kind '{}', expected 'relational' or 'bundle'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureInfo {
    pub path: PathBuf,
    pub name: Option<String>,
    pub version: Option<String>,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MockFactory {
    default_path: PathBuf,
    resolver: NameResolver,
    generic_entry: String,
    diagnostics: Diagnostics,
}

impl Default for MockFactory {
    fn default() -> Self {
        MockFactory::from_config(&Config::default())
    }
}

impl MockFactory {
    pub fn from_config(config: &Config) -> Self {
        MockFactory {
            default_path: config.fixture.path.clone(),
            resolver: config.resolver(),
            generic_entry: config.bundle.generic_entry.clone(),
            diagnostics: Diagnostics::new(config.access.log_level),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// The explicit path, else `$UNIDAL_MOCK_FIXTURE`, else the configured default.
    pub fn fixture_path(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match env::var_os(FIXTURE_ENV) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => self.default_path.clone(),
        }
    }

    pub fn create(&self, kind: MockKind, fixture_path: Option<&Path>) -> Result<Connection> {
        let path = self.fixture_path(fixture_path);
        if !path.is_file() {
            return Err(DalError::FixtureNotFound(path));
        }

        let store = RelationalConnection::open_read_only(&path)?;
        let info = read_info(&store, &path)?;
        self.diagnostics.info(format!(
            "opened {:?} mock fixture {} (version {}) with {} tables",
            kind,
            info.name.as_deref().unwrap_or("<unnamed>"),
            info.version.as_deref().unwrap_or("?"),
            info.tables.len()
        ));

        match kind {
            MockKind::Relational => Ok(Connection::Relational(store)),
            MockKind::Bundle => self.load_bundle(store, info.tables),
        }
    }

    /// Materializes every table, closes the store and wraps the tables in a
    /// bundle. The bundle's generic entry applies the same name resolution as
    /// the relational path, and rendered queries run against an in-memory
    /// mirror of the same tables.
    fn load_bundle(&self, store: RelationalConnection, names: Vec<String>) -> Result<Connection> {
        let catalog = store.catalog()?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let table = store.query(&format!("SELECT * FROM {}", quote_identifier(&name)))?;
            self.diagnostics.trace(format!("loaded '{}' ({} rows)", name, table.row_count()));
            tables.push((name, table));
        }
        store.disconnect()?;

        let mirror = build_mirror(&catalog, &tables)?;
        let shared: Rc<Vec<(String, ResultTable)>> = Rc::new(tables);
        let mut bundle = AccessorBundle::new();
        for (name, table) in shared.iter() {
            bundle.insert(name.clone(), BundleEntry::Value(Dataset::Table(table.clone())));
        }

        let resolver = self.resolver.clone();
        let lookup_tables = Rc::clone(&shared);
        bundle.insert(
            self.generic_entry.clone(),
            BundleEntry::Lookup(Box::new(move |dataset: &str| {
                let found = resolver.find(dataset, |candidate| Ok(lookup_tables.iter().any(|(n, _)| n == candidate)))?;
                Ok(found.and_then(|name| {
                    lookup_tables
                        .iter()
                        .find(|(n, _)| *n == name)
                        .map(|(_, table)| Dataset::Table(table.clone()))
                }))
            })),
        );

        Ok(Connection::Bundle(bundle.with_query_engine(move |sql: &str| mirror.query(sql))))
    }
}

/// Recreates the materialized tables in a private in-memory database, with
/// the column types the fixture declares. Views are mirrored as tables.
fn build_mirror(catalog: &Catalog, tables: &[(String, ResultTable)]) -> Result<RelationalConnection> {
    let mirror = RelationalConnection::open_in_memory()?;
    let tx = mirror.raw().unchecked_transaction()?;
    for (name, table) in tables {
        let declared = catalog.table(name);
        let columns: Vec<String> = table
            .column_names()
            .into_iter()
            .map(|column| {
                let type_name = declared
                    .and_then(|t| t.columns.iter().find(|c| c.name == column))
                    .map(|c| c.type_name.as_str())
                    .unwrap_or("");
                format!("{} {}", quote_identifier(column), type_name).trim_end().to_string()
            })
            .collect();
        tx.execute_batch(&format!("CREATE TABLE {} ({})", quote_identifier(name), columns.join(", ")))?;

        let placeholders = vec!["?"; columns.len()].join(", ");
        let mut insert = tx.prepare(&format!("INSERT INTO {} VALUES ({})", quote_identifier(name), placeholders))?;
        for index in 0..table.row_count() {
            let row = table.row(index).unwrap_or_default();
            insert.execute(rusqlite::params_from_iter(row))?;
        }
    }
    tx.commit()?;
    Ok(mirror)
}

/// Reads the fixture's tables and optional name/version metadata.
pub fn describe_fixture<P: AsRef<Path>>(path: P) -> Result<FixtureInfo> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(DalError::FixtureNotFound(path.to_path_buf()));
    }
    let store = RelationalConnection::open_read_only(path)?;
    let info = read_info(&store, path)?;
    store.disconnect()?;
    Ok(info)
}

fn read_info(store: &RelationalConnection, path: &Path) -> Result<FixtureInfo> {
    let tables = table_names(store.raw())?;
    let (name, version) = if tables.iter().any(|t| t == FIXTURE_META_TABLE) {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", quote_identifier(FIXTURE_META_TABLE));
        let lookup = |key: &str| -> Result<Option<String>> {
            Ok(store.raw().query_row(&sql, [key], |row| row.get(0)).optional()?)
        };
        (lookup("name")?, lookup("version")?)
    } else {
        (None, None)
    };

    Ok(FixtureInfo {
        path: path.to_path_buf(),
        name,
        version,
        tables,
    })
}

/// Builds a mock connection with the default configuration.
pub fn create_mock_connection(kind: MockKind, fixture_path: Option<&Path>) -> Result<Connection> {
    MockFactory::default().create(kind, fixture_path)
}
