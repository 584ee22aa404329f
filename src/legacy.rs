//! The fallback retrieval path.
//!
//! Runs whenever the lazy path misses or fails. It handles every connection
//! shape with direct, synchronous execution and reports "no data" rather
//! than failing for anything but classification and shape errors.

use crate::access::{FetchRequest, Lookup, Retriever};
use crate::connection::{classify, AccessorBundle, BundleEntry, Connection};
use crate::core::db::{quote_identifier, RelationalConnection};
use crate::core::{DalError, Result};
use crate::diagnostics::Diagnostics;
use crate::resolve::NameResolver;

pub const DEFAULT_GENERIC_ENTRY: &str = "get_data";
pub const DEFAULT_GETTER_PREFIX: &str = "get_";

#[derive(Debug, Clone)]
pub struct LegacyRetriever {
    resolver: NameResolver,
    generic_entry: String,
    getter_prefix: String,
}

impl Default for LegacyRetriever {
    fn default() -> Self {
        LegacyRetriever::new(NameResolver::default(), DEFAULT_GENERIC_ENTRY, DEFAULT_GETTER_PREFIX)
    }
}

impl LegacyRetriever {
    pub fn new(resolver: NameResolver, generic_entry: impl Into<String>, getter_prefix: impl Into<String>) -> Self {
        LegacyRetriever {
            resolver,
            generic_entry: generic_entry.into(),
            getter_prefix: getter_prefix.into(),
        }
    }

    fn dispatch(&self, conn: &Connection, request: &FetchRequest<'_>, diag: &Diagnostics) -> Result<Lookup> {
        let classified = classify(conn)?;
        if classified.unwrapped {
            diag.debug(format!("deferred connection initialized as {}", classified.kind));
        }
        match classified.target {
            Connection::Relational(relational) => self.fetch_relational(relational, request, diag),
            Connection::Bundle(bundle) => self.fetch_bundle(bundle, request, diag),
            Connection::Literal(dataset) => dataset.clone().into_table().map(Lookup::Found),
            Connection::Deferred(_) => Err(DalError::Classification(
                "unsupported connection type: unresolved deferred connection".to_string(),
            )),
        }
    }

    fn fetch_relational(
        &self,
        conn: &RelationalConnection,
        request: &FetchRequest<'_>,
        diag: &Diagnostics,
    ) -> Result<Lookup> {
        let sql = match request.sql() {
            Some(sql) => sql.to_string(),
            None => {
                let name = self
                    .resolver
                    .resolve(request.dataset(), |candidate| conn.has_table(candidate))?;
                format!("SELECT * FROM {}", quote_identifier(&name))
            }
        };
        diag.trace(format!("executing directly: {}", sql));
        conn.query(&sql).map(Lookup::Found)
    }

    /// Runs a rendered query through the bundle's engine when it has one.
    /// Otherwise tries the generic lookup entry, the exact dataset key, then the
    /// conventional getter key. The first non-empty answer wins; a failing
    /// entry only moves on to the next one.
    fn fetch_bundle(&self, bundle: &AccessorBundle, request: &FetchRequest<'_>, diag: &Diagnostics) -> Result<Lookup> {
        let dataset = request.dataset();
        if let Some(sql) = request.sql() {
            match bundle.run_query(sql) {
                Some(result) => {
                    diag.trace(format!("bundle query engine running: {}", sql));
                    return result.map(Lookup::Found);
                }
                None => diag.warn(format!(
                    "bundle cannot run queries, template ignored for '{}'",
                    dataset
                )),
            }
        }

        let getter_key = format!("{}{}", self.getter_prefix, dataset);
        let attempts = [
            (self.generic_entry.as_str(), "generic entry"),
            (dataset, "entry"),
            (getter_key.as_str(), "getter"),
        ];

        for (key, label) in attempts {
            let Some(entry) = bundle.get(key) else {
                continue;
            };
            if key == self.generic_entry && !matches!(entry, BundleEntry::Lookup(_)) {
                continue;
            }
            match entry.call(dataset) {
                Ok(Some(found)) => {
                    diag.debug(format!("bundle {} '{}' answered for '{}'", label, key, dataset));
                    return found.into_table().map(Lookup::Found);
                }
                Ok(None) => diag.trace(format!("bundle {} '{}' had nothing for '{}'", label, key, dataset)),
                Err(e) => diag.warn(format!("bundle {} '{}' failed for '{}': {}", label, key, dataset, e)),
            }
        }

        Ok(Lookup::Miss)
    }
}

impl Retriever for LegacyRetriever {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn try_fetch(&self, conn: &Connection, request: &FetchRequest<'_>, diag: &Diagnostics) -> Result<Lookup> {
        match self.dispatch(conn, request, diag) {
            Ok(lookup) => Ok(lookup),
            Err(e) if e.propagates_from_fallback() => Err(e),
            Err(e) => {
                diag.warn(format!(
                    "legacy retrieval of '{}' failed, reporting no data: {}",
                    request.dataset(),
                    e
                ));
                Ok(Lookup::Miss)
            }
        }
    }
}
