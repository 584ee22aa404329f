//! The preferred retrieval path: deferred table references over relational
//! connections.
//!
//! A [`TableRef`] names a physical table (or wraps raw SQL) and collects
//! filters, projections, ordering and a row limit. Nothing touches the
//! engine until [`TableRef::materialize`].

use crate::access::{FetchRequest, Lookup, Retriever};
use crate::connection::{classify, Connection};
use crate::core::db::{quote_identifier, RelationalConnection};
use crate::core::{DalError, Result};
use crate::diagnostics::Diagnostics;
use crate::resolve::NameResolver;
use crate::table::ResultTable;

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Table(String),
    Sql(String),
}

/// A not-yet-materialized relational dataset.
#[derive(Debug, Clone)]
pub struct TableRef<'c> {
    conn: &'c RelationalConnection,
    source: Source,
    columns: Option<Vec<String>>,
    filters: Vec<String>,
    order: Vec<String>,
    limit: Option<usize>,
}

impl<'c> TableRef<'c> {
    /// A reference to a physical table, used verbatim.
    pub fn table(conn: &'c RelationalConnection, name: impl Into<String>) -> Self {
        Self::from_source(conn, Source::Table(name.into()))
    }

    /// A reference to the rows of an arbitrary query.
    pub fn sql(conn: &'c RelationalConnection, sql: impl Into<String>) -> Self {
        Self::from_source(conn, Source::Sql(sql.into()))
    }

    fn from_source(conn: &'c RelationalConnection, source: Source) -> Self {
        TableRef {
            conn,
            source,
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// The physical table name, for table-backed references.
    pub fn table_name(&self) -> Option<&str> {
        match &self.source {
            Source::Table(name) => Some(name),
            Source::Sql(_) => None,
        }
    }

    /// Adds a raw SQL predicate; predicates are combined with `AND`.
    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        self.filters.push(predicate.into());
        self
    }

    /// Restricts the output to the given columns, in that order.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.order.push(expr.into());
        self
    }

    pub fn limit(mut self, rows: usize) -> Self {
        self.limit = Some(rows);
        self
    }

    fn is_plain(&self) -> bool {
        self.columns.is_none() && self.filters.is_empty() && self.order.is_empty() && self.limit.is_none()
    }

    /// The statement `materialize` will run.
    pub fn to_sql(&self) -> String {
        let from = match &self.source {
            Source::Sql(sql) if self.is_plain() => return sql.clone(),
            Source::Sql(sql) => format!("({}) AS src", sql.trim().trim_end_matches(';')),
            Source::Table(name) => quote_identifier(name),
        };

        let projection = match &self.columns {
            Some(columns) if !columns.is_empty() => columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "*".to_string(),
        };

        let mut sql = format!("SELECT {} FROM {}", projection, from);
        if !self.filters.is_empty() {
            let predicates: Vec<String> = self.filters.iter().map(|f| format!("({})", f)).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }

    /// Runs the reference against the engine.
    ///
    /// Selected columns of a known table are checked against the catalog
    /// before anything is executed.
    pub fn materialize(&self) -> Result<ResultTable> {
        if let (Source::Table(name), Some(columns)) = (&self.source, &self.columns) {
            let catalog = self.conn.catalog()?;
            if let Some(table) = catalog.table(name) {
                if let Some(unknown) = columns.iter().find(|c| !table.columns.iter().any(|tc| tc.name == **c)) {
                    return Err(DalError::Query(format!("no such column '{}' in table '{}'", unknown, name)));
                }
            }
        }
        self.conn.query(&self.to_sql())
    }
}

/// Retrieval through table references. Only relational connections (direct
/// or behind one deferral) are served; every other shape is a miss.
#[derive(Debug, Clone, Default)]
pub struct LazyRetriever {
    resolver: NameResolver,
}

impl LazyRetriever {
    pub fn new(resolver: NameResolver) -> Self {
        LazyRetriever { resolver }
    }

    /// Resolves `dataset` against the catalog and returns a reference to it.
    pub fn table_ref<'a>(&self, conn: &'a Connection, dataset: &str) -> Result<TableRef<'a>> {
        let relational = relational_target(conn)?.ok_or_else(|| {
            DalError::Classification(format!(
                "table references need a relational connection, got {}",
                conn.kind()
            ))
        })?;
        let name = self.resolver.resolve(dataset, |candidate| relational.has_table(candidate))?;
        Ok(TableRef::table(relational, name))
    }
}

fn relational_target(conn: &Connection) -> Result<Option<&RelationalConnection>> {
    match classify(conn)?.target {
        Connection::Relational(relational) => Ok(Some(relational)),
        _ => Ok(None),
    }
}

impl Retriever for LazyRetriever {
    fn name(&self) -> &'static str {
        "lazy"
    }

    fn try_fetch(&self, conn: &Connection, request: &FetchRequest<'_>, diag: &Diagnostics) -> Result<Lookup> {
        let Some(relational) = relational_target(conn)? else {
            return Ok(Lookup::Miss);
        };

        let reference = match request.sql() {
            Some(sql) => TableRef::sql(relational, sql),
            None => {
                let name = self
                    .resolver
                    .resolve(request.dataset(), |candidate| relational.has_table(candidate))?;
                if name != request.dataset() {
                    diag.debug(format!("dataset '{}' resolved to table '{}'", request.dataset(), name));
                }
                TableRef::table(relational, name)
            }
        };

        diag.trace(format!("materializing: {}", reference.to_sql()));
        reference.materialize().map(Lookup::Found)
    }
}
