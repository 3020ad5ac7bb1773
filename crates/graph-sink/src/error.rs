//! Error types for graph sinks.

use sync_core::NodeKey;
use thiserror::Error;

/// Errors returned by [`GraphSink`](crate::GraphSink) implementations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The underlying store rejected or failed the operation.
    #[error("Graph store error: {0}")]
    Backend(String),

    /// A relationship endpoint was not found by its identity.
    #[error("Relationship endpoint {0} does not exist")]
    MissingEndpoint(NodeKey),

    /// A write would give a second node the value of a registered identity.
    #[error("Identity {0} is already held by another node")]
    IdentityConflict(NodeKey),

    /// A label, property key or relationship type cannot be used as an identifier.
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// A value cannot be stored in, or read back from, the graph store.
    #[error("Unsupported value for property '{property}': {reason}")]
    UnsupportedValue { property: String, reason: String },
}

impl SinkError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}
