//! The main accessor: named datasets from any connection shape.
//!
//! A call renders the query template (if any), tries the lazy path, falls
//! back to the legacy path, and for batches runs each query object in order
//! before combining the results.

use crate::config::Config;
use crate::connection::{classify, Connection};
use crate::core::{DalError, Result};
use crate::diagnostics::{Diagnostics, LogLevel};
use crate::lazy::{LazyRetriever, TableRef};
use crate::legacy::LegacyRetriever;
use crate::table::{ResultTable, Value};
use crate::template::{render, ParameterSet, QueryObject};

/// Result of one retrieval attempt. A miss is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(ResultTable),
    Miss,
}

/// A retrieval strategy.
pub trait Retriever {
    fn name(&self) -> &'static str;

    fn try_fetch(&self, conn: &Connection, request: &FetchRequest<'_>, diag: &Diagnostics) -> Result<Lookup>;
}

/// A dataset name plus the already rendered SQL, if a template was given.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest<'a> {
    dataset: &'a str,
    sql: Option<String>,
}

impl<'a> FetchRequest<'a> {
    pub fn new(dataset: &'a str) -> Self {
        FetchRequest { dataset, sql: None }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn dataset(&self) -> &str {
        self.dataset
    }

    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }
}

/// Optional arguments of [`DataAccess::fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub template: Option<String>,
    pub params: ParameterSet,
    pub queries: Vec<QueryObject>,
    /// Overrides the configured default for batches.
    pub combine: Option<bool>,
    /// Overrides the logger threshold for this call only.
    pub log_level: Option<LogLevel>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn query(mut self, query: QueryObject) -> Self {
        self.queries.push(query);
        self
    }

    pub fn queries(mut self, queries: Vec<QueryObject>) -> Self {
        self.queries = queries;
        self
    }

    pub fn combine(mut self, combine: bool) -> Self {
        self.combine = Some(combine);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }
}

/// Outcome of one query object in an uncombined batch.
#[derive(Debug)]
pub enum BatchItem {
    Table(ResultTable),
    NoData,
    Failed(DalError),
}

impl BatchItem {
    pub fn table(&self) -> Option<&ResultTable> {
        match self {
            BatchItem::Table(table) => Some(table),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum Fetched {
    Table(ResultTable),
    Tables(Vec<BatchItem>),
    /// Dispatch succeeded but no dataset matched.
    NoData,
}

impl Fetched {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Fetched::NoData)
    }

    pub fn table(&self) -> Option<&ResultTable> {
        match self {
            Fetched::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<ResultTable> {
        match self {
            Fetched::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn into_items(self) -> Option<Vec<BatchItem>> {
        match self {
            Fetched::Tables(items) => Some(items),
            _ => None,
        }
    }
}

/// The data access entry point: holds the logger and both strategies.
#[derive(Debug, Clone)]
pub struct DataAccess {
    diagnostics: Diagnostics,
    lazy: LazyRetriever,
    legacy: LegacyRetriever,
    combine_default: bool,
}

impl Default for DataAccess {
    fn default() -> Self {
        DataAccess::from_config(&Config::default())
    }
}

impl DataAccess {
    pub fn from_config(config: &Config) -> Self {
        let resolver = config.resolver();
        DataAccess {
            diagnostics: Diagnostics::new(config.access.log_level),
            lazy: LazyRetriever::new(resolver.clone()),
            legacy: LegacyRetriever::new(
                resolver,
                config.bundle.generic_entry.clone(),
                config.bundle.getter_prefix.clone(),
            ),
            combine_default: config.access.combine,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Fetches `dataset` from `conn`.
    ///
    /// With query objects in `options` this is a batch (see
    /// [`DataAccess::fetch_batch`]); otherwise the optional template is
    /// rendered and a single table or [`Fetched::NoData`] is returned.
    pub fn fetch(&self, conn: &Connection, dataset: &str, options: &FetchOptions) -> Result<Fetched> {
        let diag = match options.log_level {
            Some(level) => self.diagnostics.with_threshold(level),
            None => self.diagnostics.clone(),
        };

        if !options.queries.is_empty() {
            if options.template.is_some() || !options.params.is_empty() {
                diag.warn(format!(
                    "template and parameters ignored for '{}': query objects carry their own",
                    dataset
                ));
            }
            let combine = options.combine.unwrap_or(self.combine_default);
            return self.run_batch(conn, dataset, &options.queries, combine, &diag);
        }

        let mut request = FetchRequest::new(dataset);
        if let Some(template) = &options.template {
            request = request.with_sql(render(template, dataset, &options.params)?);
        }

        Ok(match self.fetch_one(conn, &request, &diag)? {
            Some(table) => Fetched::Table(table),
            None => Fetched::NoData,
        })
    }

    /// Runs every query object in order against `conn`.
    ///
    /// With `combine` the tables are concatenated row-wise and any missing or
    /// failed result is a [`DalError::Combine`]; so is a connection that
    /// cannot apply queries, since every item would repeat the same dataset.
    /// Without it, each outcome is returned in place and failures never abort
    /// sibling queries. An empty batch yields an empty table, or no items.
    pub fn fetch_batch(&self, conn: &Connection, dataset: &str, queries: &[QueryObject], combine: bool) -> Result<Fetched> {
        self.run_batch(conn, dataset, queries, combine, &self.diagnostics)
    }

    /// A deferred reference to a relational dataset.
    pub fn table_ref<'a>(&self, conn: &'a Connection, dataset: &str) -> Result<TableRef<'a>> {
        self.lazy.table_ref(conn, dataset)
    }

    fn fetch_one(&self, conn: &Connection, request: &FetchRequest<'_>, diag: &Diagnostics) -> Result<Option<ResultTable>> {
        match self.resolve_target(conn, request.dataset(), diag)? {
            Some(target) => self.fetch_target(target, request, diag),
            None => {
                diag.info(format!("no data for '{}'", request.dataset()));
                Ok(None)
            }
        }
    }

    /// Classifies `conn` once per call, so a deferral is invoked at most once.
    /// A failed initializer means no data unless its error must propagate.
    fn resolve_target<'c>(&self, conn: &'c Connection, dataset: &str, diag: &Diagnostics) -> Result<Option<&'c Connection>> {
        match classify(conn) {
            Ok(classified) => {
                if classified.unwrapped {
                    diag.debug(format!("deferred connection initialized as {}", classified.kind));
                }
                Ok(Some(classified.target))
            }
            Err(e) if e.propagates_from_fallback() => Err(e),
            Err(e) => {
                diag.warn(format!(
                    "deferred connection for '{}' failed to initialize, reporting no data: {}",
                    dataset, e
                ));
                Ok(None)
            }
        }
    }

    fn fetch_target(&self, target: &Connection, request: &FetchRequest<'_>, diag: &Diagnostics) -> Result<Option<ResultTable>> {
        match self.lazy.try_fetch(target, request, diag) {
            Ok(Lookup::Found(table)) => {
                diag.debug(format!(
                    "{} path returned {} rows for '{}'",
                    self.lazy.name(),
                    table.row_count(),
                    request.dataset()
                ));
                return Ok(Some(table));
            }
            Ok(Lookup::Miss) => diag.debug(format!(
                "{} path does not serve {} connections, using {} path for '{}'",
                self.lazy.name(),
                target.kind(),
                self.legacy.name(),
                request.dataset()
            )),
            Err(e) => diag.warn(format!(
                "{} retrieval of '{}' failed, falling back to {} path: {}",
                self.lazy.name(),
                request.dataset(),
                self.legacy.name(),
                e
            )),
        }

        match self.legacy.try_fetch(target, request, diag)? {
            Lookup::Found(table) => Ok(Some(table)),
            Lookup::Miss => {
                diag.info(format!("no data for '{}'", request.dataset()));
                Ok(None)
            }
        }
    }

    fn run_batch(
        &self,
        conn: &Connection,
        dataset: &str,
        queries: &[QueryObject],
        combine: bool,
        diag: &Diagnostics,
    ) -> Result<Fetched> {
        if queries.is_empty() {
            return Ok(if combine {
                Fetched::Table(ResultTable::default())
            } else {
                Fetched::Tables(Vec::new())
            });
        }

        let Some(target) = self.resolve_target(conn, dataset, diag)? else {
            if combine {
                return Err(DalError::Combine(format!("no connection available for '{}'", dataset)));
            }
            return Ok(Fetched::Tables(queries.iter().map(|_| BatchItem::NoData).collect()));
        };
        if combine && !applies_queries(target) {
            return Err(DalError::Combine(format!(
                "{} connection cannot apply batch queries for '{}'",
                target.kind(),
                dataset
            )));
        }

        let mut items = Vec::with_capacity(queries.len());
        for (index, query) in queries.iter().enumerate() {
            let outcome = query
                .render(dataset)
                .and_then(|sql| self.fetch_target(target, &FetchRequest::new(dataset).with_sql(sql), diag));
            let item = match outcome {
                Ok(Some(table)) => BatchItem::Table(table),
                Ok(None) => BatchItem::NoData,
                Err(e) => {
                    diag.warn(format!("batch query {} for '{}' failed: {}", index, dataset, e));
                    BatchItem::Failed(e)
                }
            };
            items.push(item);
        }

        if !combine {
            return Ok(Fetched::Tables(items));
        }

        let mut tables = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                BatchItem::Table(table) => tables.push(table),
                BatchItem::NoData => {
                    return Err(DalError::Combine(format!("query {} returned no data", index)));
                }
                BatchItem::Failed(e) => {
                    return Err(DalError::Combine(format!("query {} failed: {}", index, e)));
                }
            }
        }
        ResultTable::concat(tables).map(Fetched::Table)
    }
}

/// Whether rendered queries change what `target` returns.
fn applies_queries(target: &Connection) -> bool {
    match target {
        Connection::Relational(_) => true,
        Connection::Bundle(bundle) => bundle.is_queryable(),
        Connection::Deferred(_) | Connection::Literal(_) => false,
    }
}

/// Fetches with the default configuration.
pub fn fetch(conn: &Connection, dataset: &str, options: &FetchOptions) -> Result<Fetched> {
    DataAccess::default().fetch(conn, dataset, options)
}

/// Runs a batch with the default configuration.
pub fn fetch_batch(conn: &Connection, dataset: &str, queries: &[QueryObject], combine: bool) -> Result<Fetched> {
    DataAccess::default().fetch_batch(conn, dataset, queries, combine)
}

/// Builds a table reference with the default name resolution.
pub fn table_ref<'a>(conn: &'a Connection, dataset: &str) -> Result<TableRef<'a>> {
    DataAccess::default().table_ref(conn, dataset)
}
