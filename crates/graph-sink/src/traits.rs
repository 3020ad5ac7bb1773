//! GraphSink trait definition.

use crate::error::SinkError;
use sync_core::{GraphValue, Node, NodeKey, Properties};

/// What an idempotent merge found in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The entity did not exist and was created.
    Created,
    /// The entity already existed; it was updated in place (or left as is).
    Matched,
}

/// Trait for writing nodes and relationships to a graph store.
///
/// Every write is an idempotent merge keyed by identity, and each call must
/// be atomic on the store side: two concurrent `merge_node` calls for the
/// same [`NodeKey`] end with exactly one node. Callers may therefore run
/// several tables concurrently against one sink and may safely re-run a
/// load after a failure.
///
/// # Usage Pattern
///
/// The load engine is generic over the sink:
///
/// ```ignore
/// pub async fn run_full_load<T: TableSource, G: GraphSink>(
///     source: &T,
///     sink: &G,
///     opts: &LoadOpts,
/// ) -> Result<LoadReport, LoadError> {
///     sink.merge_node(&identity, &properties).await?;
/// }
/// ```
///
/// The CLI picks Neo4j or the in-memory graph once; everything after that is
/// monomorphized for the chosen implementation.
#[async_trait::async_trait]
pub trait GraphSink: Send + Sync {
    /// Make merges on `(label, key)` race-free.
    ///
    /// Stores that need a uniqueness constraint for atomic merges create it
    /// here. Must be idempotent.
    async fn ensure_identity(&self, label: &str, key: &str) -> Result<(), SinkError>;

    /// Find a node with `label` whose property `key` equals `value`.
    async fn match_node(
        &self,
        label: &str,
        key: &str,
        value: &GraphValue,
    ) -> Result<Option<Node>, SinkError>;

    /// Create the node for `identity` or merge `properties` into it.
    ///
    /// Null properties are not written and never erase stored values.
    /// An empty `properties` map creates a stub holding only the identity
    /// property.
    async fn merge_node(
        &self,
        identity: &NodeKey,
        properties: &Properties,
    ) -> Result<MergeOutcome, SinkError>;

    /// Create the typed relationship `source -> target` unless it exists.
    ///
    /// Both endpoints must already exist; otherwise
    /// [`SinkError::MissingEndpoint`] is returned.
    async fn merge_relationship(
        &self,
        source: &NodeKey,
        target: &NodeKey,
        rel_type: &str,
    ) -> Result<MergeOutcome, SinkError>;
}
