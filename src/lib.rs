//! Uniform access to named datasets across heterogeneous data sources.
//!
//! A [`Connection`] is either a relational engine connection, a deferred
//! connection produced on first use, a bundle of named tables and accessor
//! functions, or a literal table. [`fetch`] returns the same
//! [`ResultTable`] regardless of which shape backs the data, trying the lazy
//! table-reference path first and falling back to the legacy path.

// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod access;
pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod lazy;
pub mod legacy;
pub mod mock;
pub mod resolve;
pub mod table;
pub mod template;

#[cfg(test)]
mod test_utils;

pub use access::{fetch, fetch_batch, table_ref, BatchItem, DataAccess, FetchOptions, Fetched};
pub use config::{load_config, Config};
pub use connection::{AccessorBundle, BundleEntry, Connection, ConnectionKind, DeferredConnection};
pub use crate::core::db::RelationalConnection;
pub use crate::core::{DalError, Result};
pub use diagnostics::{init_tracing, Diagnostics, LogLevel, LogSink};
pub use lazy::TableRef;
pub use mock::{create_mock_connection, MockKind};
pub use table::{Column, Dataset, ResultTable, Value};
pub use template::{ParameterSet, QueryObject};
