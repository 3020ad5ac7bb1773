//! Error types for the load engine.

use graph_sink::SinkError;
use relational_source::SourceError;
use thiserror::Error;

/// Errors raised while materializing a schema.
///
/// `SchemaIntrospection` and `TableListing` abort the run. The others are
/// recovered from where they occur: a `DataFetch` failure skips the rest of
/// its table, `MissingPrimaryKey` and `Sink` skip a single row or edge.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Foreign-key metadata could not be read.
    #[error("Failed to read foreign keys of schema '{schema}': {source}")]
    SchemaIntrospection {
        schema: String,
        #[source]
        source: SourceError,
    },

    /// Base tables of the schema could not be listed.
    #[error("Failed to list tables of schema '{schema}': {source}")]
    TableListing {
        schema: String,
        #[source]
        source: SourceError,
    },

    /// A table could not be opened or its row stream failed.
    #[error("Failed to fetch rows of table '{table}': {source}")]
    DataFetch {
        table: String,
        #[source]
        source: SourceError,
    },

    /// A row has no value for its table's primary-key column.
    #[error("Row of table '{table}' has no value for primary key column '{column}'")]
    MissingPrimaryKey { table: String, column: String },

    /// A write to the graph store failed.
    #[error(transparent)]
    Sink(#[from] SinkError),
}
