//! Shared data models.

pub mod connection;
pub mod query;
pub mod request;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionIdentity, DbDriver};
pub use query::{distinct_values, RowSet};
pub use request::{ColumnPath, ConnectPath, TablePath, ValuePath};
pub use schema::{ColumnMeta, SchemaSnapshot};
