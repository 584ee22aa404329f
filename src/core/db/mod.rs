/// Database Module
///
/// This module provides the SQLite engine layer the relational retrieval
/// paths run on.
///
/// ## Architecture
///
/// - **Connection Management** (`connection.rs`): owned sessions, read-only opening, explicit disconnect
/// - **Schema Introspection** (`schema.rs`): table enumeration and existence checks
/// - **Query Execution** (`query.rs`): SQL execution and typed materialization
///
/// ## Error Handling
///
/// All database operations use the standardized `DalError` type for consistent error propagation.
pub mod connection;
pub mod query;
pub mod schema;

pub use connection::*;
pub use query::*;
pub use schema::*;
