//! The four shapes a data source can take, and the classifier that maps a
//! connection onto a retrieval strategy.
//!
//! Adapters build a [`Connection`] explicitly at the boundary, so
//! classification is a match on a closed set of variants. The only runtime
//! work left is unwrapping a [`DeferredConnection`], which happens at most one
//! level deep.

use crate::core::db::RelationalConnection;
use crate::core::{DalError, Result};
use crate::table::{Dataset, ResultTable};
use once_cell::unsync::OnceCell;
use std::fmt;

/// An opaque handle to a data source. Owned by the caller.
pub enum Connection {
    Relational(RelationalConnection),
    Deferred(DeferredConnection),
    Bundle(AccessorBundle),
    Literal(Dataset),
}

impl Connection {
    pub fn relational(conn: RelationalConnection) -> Self {
        Connection::Relational(conn)
    }

    pub fn deferred<F>(init: F) -> Self
    where
        F: Fn() -> Result<Connection> + 'static,
    {
        Connection::Deferred(DeferredConnection::new(init))
    }

    pub fn literal(dataset: impl Into<Dataset>) -> Self {
        Connection::Literal(dataset.into())
    }

    /// The variant of this value, without unwrapping deferrals.
    pub fn kind(&self) -> ConnectionKind {
        match self {
            Connection::Relational(_) => ConnectionKind::Relational,
            Connection::Deferred(_) => ConnectionKind::Deferred,
            Connection::Bundle(_) => ConnectionKind::Bundle,
            Connection::Literal(_) => ConnectionKind::Literal,
        }
    }
}

impl From<RelationalConnection> for Connection {
    fn from(conn: RelationalConnection) -> Self {
        Connection::Relational(conn)
    }
}

impl From<AccessorBundle> for Connection {
    fn from(bundle: AccessorBundle) -> Self {
        Connection::Bundle(bundle)
    }
}

impl From<ResultTable> for Connection {
    fn from(table: ResultTable) -> Self {
        Connection::Literal(Dataset::Table(table))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Relational(c) => f.debug_tuple("Relational").field(&c.path()).finish(),
            Connection::Deferred(d) => f.debug_tuple("Deferred").field(d).finish(),
            Connection::Bundle(b) => f.debug_tuple("Bundle").field(&b.names()).finish(),
            Connection::Literal(_) => f.write_str("Literal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Relational,
    Deferred,
    Bundle,
    Literal,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionKind::Relational => "relational",
            ConnectionKind::Deferred => "deferred",
            ConnectionKind::Bundle => "bundle",
            ConnectionKind::Literal => "literal",
        };
        f.write_str(name)
    }
}

type Initializer = Box<dyn Fn() -> Result<Connection>>;

/// A connection produced on first use.
///
/// The initializer runs until it succeeds once; the produced connection is
/// then kept for the lifetime of the wrapper.
pub struct DeferredConnection {
    init: Initializer,
    cell: OnceCell<Box<Connection>>,
}

impl DeferredConnection {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> Result<Connection> + 'static,
    {
        DeferredConnection {
            init: Box::new(init),
            cell: OnceCell::new(),
        }
    }

    /// Runs the initializer if needed and returns the wrapped connection.
    pub fn resolve(&self) -> Result<&Connection> {
        self.cell
            .get_or_try_init(|| (self.init)().map(Box::new))
            .map(|boxed| boxed.as_ref())
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for DeferredConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredConnection")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

type Getter = Box<dyn Fn() -> Result<Option<Dataset>>>;
type Lookup = Box<dyn Fn(&str) -> Result<Option<Dataset>>>;

/// One named entry of an accessor bundle.
pub enum BundleEntry {
    /// A literal table.
    Value(Dataset),
    /// A zero-argument retrieval function.
    Getter(Getter),
    /// A retrieval function taking the requested dataset name.
    Lookup(Lookup),
}

impl BundleEntry {
    /// Produces the entry's dataset. `name` is only passed to lookups.
    pub fn call(&self, name: &str) -> Result<Option<Dataset>> {
        match self {
            BundleEntry::Value(dataset) => Ok(Some(dataset.clone())),
            BundleEntry::Getter(getter) => getter(),
            BundleEntry::Lookup(lookup) => lookup(name),
        }
    }
}

impl fmt::Debug for BundleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleEntry::Value(_) => f.write_str("Value"),
            BundleEntry::Getter(_) => f.write_str("Getter"),
            BundleEntry::Lookup(_) => f.write_str("Lookup"),
        }
    }
}

type QueryEngine = Box<dyn Fn(&str) -> Result<ResultTable>>;

/// An ordered mapping from dataset name to a table or a retrieval function.
///
/// A bundle may also carry a query engine. Rendered templates are run through
/// it; a bundle without one cannot apply them.
#[derive(Default)]
pub struct AccessorBundle {
    entries: Vec<(String, BundleEntry)>,
    engine: Option<QueryEngine>,
}

impl fmt::Debug for AccessorBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorBundle")
            .field("entries", &self.entries)
            .field("queryable", &self.engine.is_some())
            .finish()
    }
}

impl AccessorBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing an existing one of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, entry: BundleEntry) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((name, entry)),
        }
    }

    pub fn with_table(mut self, name: impl Into<String>, dataset: impl Into<Dataset>) -> Self {
        self.insert(name, BundleEntry::Value(dataset.into()));
        self
    }

    pub fn with_getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn() -> Result<Option<Dataset>> + 'static,
    {
        self.insert(name, BundleEntry::Getter(Box::new(getter)));
        self
    }

    pub fn with_lookup<F>(mut self, name: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Result<Option<Dataset>> + 'static,
    {
        self.insert(name, BundleEntry::Lookup(Box::new(lookup)));
        self
    }

    pub fn with_query_engine<F>(mut self, engine: F) -> Self
    where
        F: Fn(&str) -> Result<ResultTable> + 'static,
    {
        self.engine = Some(Box::new(engine));
        self
    }

    pub fn is_queryable(&self) -> bool {
        self.engine.is_some()
    }

    /// Runs `sql` through the query engine. `None` when the bundle has none.
    pub fn run_query(&self, sql: &str) -> Option<Result<ResultTable>> {
        self.engine.as_ref().map(|engine| engine(sql))
    }

    pub fn get(&self, name: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The outcome of classification: the strategy and the connection it runs on.
#[derive(Debug)]
pub struct Classified<'a> {
    pub kind: ConnectionKind,
    pub target: &'a Connection,
    /// Whether a deferred wrapper was unwrapped to reach `target`.
    pub unwrapped: bool,
}

/// Determines the retrieval strategy for `conn`.
///
/// A deferred connection is invoked once and its product classified; a
/// deferral that yields another deferral is rejected rather than chased.
pub fn classify(conn: &Connection) -> Result<Classified<'_>> {
    match conn {
        Connection::Deferred(deferred) => {
            let inner = deferred.resolve()?;
            if let Connection::Deferred(_) = inner {
                return Err(DalError::Classification(
                    "deferred connection produced another deferred connection".to_string(),
                ));
            }
            Ok(Classified {
                kind: inner.kind(),
                target: inner,
                unwrapped: true,
            })
        }
        other => Ok(Classified {
            kind: other.kind(),
            target: other,
            unwrapped: false,
        }),
    }
}
