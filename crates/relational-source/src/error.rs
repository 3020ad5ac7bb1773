//! Error types for relational sources.

use thiserror::Error;

/// Errors returned by [`TableSource`](crate::TableSource) implementations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Could not connect to the source database.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A query failed or its result could not be read.
    #[error("Query failed: {0}")]
    Query(String),

    /// A column value has a type the source cannot convert.
    #[error("Column '{column}' has unsupported type '{type_name}'")]
    UnsupportedType { column: String, type_name: String },

    /// The requested table does not exist.
    #[error("Table '{0}' not found")]
    TableNotFound(String),
}

impl SourceError {
    pub fn query(err: impl std::fmt::Display) -> Self {
        Self::Query(err.to_string())
    }
}
