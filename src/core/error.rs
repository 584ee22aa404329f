/// Error Module
///
/// This module defines the error taxonomy of the data access layer.
/// "No data" is deliberately absent: a dataset that matched nothing is
/// reported through `Fetched::NoData`, never through `DalError`.
use std::path::PathBuf;
use thiserror::Error;

/// Comprehensive error type for the data access layer.
///
/// This enum covers:
/// - Engine failures (connection, statement preparation, execution)
/// - Connection classification and template rendering
/// - Result shaping and batch combination
/// - Mock fixture discovery and configuration loading
#[derive(Error, Debug)]
pub enum DalError {
    /// Database-related errors from SQLite operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// SQL query errors (syntax, execution, missing tables, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// The connection value could not be mapped to a retrieval strategy
    #[error("Classification error: {0}")]
    Classification(String),

    /// A template placeholder had no binding
    #[error("Template error: {0}")]
    Template(String),

    /// A retrieved value could not be coerced into a result table
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// Batch results could not be concatenated
    #[error("Combine error: {0}")]
    Combine(String),

    /// The mock fixture store does not exist
    #[error("Fixture not found: {}", .0.display())]
    FixtureNotFound(PathBuf),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing and validation errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DalError {
    /// Whether the fallback path surfaces this error to the caller.
    ///
    /// Only shape and classification failures escape; everything else is
    /// turned into a logged "no data" outcome.
    pub fn propagates_from_fallback(&self) -> bool {
        matches!(self, DalError::DataShape(_) | DalError::Classification(_))
    }
}

/// Type alias for Result to use DalError as the error type.
pub type Result<T> = std::result::Result<T, DalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let db_err = DalError::Database(rusqlite::Error::ExecuteReturnedResults);
        assert!(db_err.to_string().contains("Database error"));

        let template_err = DalError::Template("missing binding for {id}".to_string());
        assert!(template_err.to_string().contains("Template error"));

        let fixture_err = DalError::FixtureNotFound(PathBuf::from("/no/such/fixture.sqlite"));
        assert!(fixture_err.to_string().contains("/no/such/fixture.sqlite"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let dal_err: DalError = io_err.into();
        match dal_err {
            DalError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }

        let json_str = "{ invalid json }";
        let json_err: std::result::Result<serde_json::Value, serde_json::Error> = serde_json::from_str(json_str);
        let dal_err: DalError = json_err.unwrap_err().into();
        match dal_err {
            DalError::Json(_) => {}
            _ => panic!("Expected JSON error"),
        }
    }

    #[test]
    fn test_fallback_propagation_policy() {
        assert!(DalError::DataShape("ragged".into()).propagates_from_fallback());
        assert!(DalError::Classification("nested".into()).propagates_from_fallback());
        assert!(!DalError::Query("no such table".into()).propagates_from_fallback());
        assert!(!DalError::Database(rusqlite::Error::InvalidQuery).propagates_from_fallback());
    }
}
