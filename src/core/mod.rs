/// Core Module for unidal
///
/// This module contains the shared infrastructure the retrieval strategies
/// are built on: the error taxonomy and the SQLite engine layer (sessions,
/// query execution, catalog introspection).

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DalError, Result};
