//! Relationship resolution for one row.
//!
//! For every foreign key of the row's table the referenced node is looked
//! up by `(referenced_table, referenced_column = value)`. When it is not
//! there yet a stub carrying only that property is merged, so tables can be
//! processed in any order. The `RELATED_TO` edge always points from the
//! referenced node to the row's node.

use crate::report::RelationshipStats;
use crate::schema::EdgeSet;
use graph_sink::{GraphSink, MergeOutcome, SinkError};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use sync_core::{ForeignKeyEdge, NodeKey, Properties, RELATED_TO};

/// A stub node created while resolving a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CreatedStub {
    pub key: NodeKey,
    /// `table.constraint` of the foreign key that needed it
    pub created_by: String,
}

#[derive(Debug, Default)]
struct StubState {
    pending: HashSet<NodeKey>,
    completed: HashSet<NodeKey>,
}

/// Stub keys of one load and which of them a row has completed.
///
/// A key is marked pending before its stub is merged. A row merge that
/// then matches the key completes it, whichever table worker gets there
/// first. Keys are stored normalized.
#[derive(Debug, Default)]
pub struct StubRegistry {
    state: Mutex<StubState>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `key` as about to be merged as a stub.
    pub fn expect(&self, key: &NodeKey) {
        self.lock().pending.insert(key.normalized());
    }

    /// Record the merge of a row's node.
    pub fn record_row(&self, key: &NodeKey, outcome: MergeOutcome) {
        if outcome != MergeOutcome::Matched {
            return;
        }
        let key = key.normalized();
        let mut state = self.lock();
        if state.pending.contains(&key) {
            state.completed.insert(key);
        }
    }

    /// Whether a row of the stub's table merged into it during this load.
    pub fn is_completed(&self, key: &NodeKey) -> bool {
        self.lock().completed.contains(&key.normalized())
    }
}

/// Resolve every foreign key of `current_table` for one row whose node is
/// `node`.
///
/// Per-edge failures are counted in `stats` and logged; they never stop the
/// remaining edges. Returns the stubs this call created.
pub async fn resolve_relationships<G: GraphSink>(
    sink: &G,
    row: &Properties,
    current_table: &str,
    node: &NodeKey,
    edge_set: &EdgeSet,
    registry: &StubRegistry,
    stats: &mut RelationshipStats,
) -> Vec<CreatedStub> {
    let mut stubs = Vec::new();

    for edge in edge_set.edges_for(current_table) {
        let value = match row.get(&edge.parent_column) {
            Some(value) if !value.is_null() => value,
            _ => {
                tracing::debug!(
                    "No value for {}.{} on {node}, skipping edge '{}'",
                    edge.parent_table,
                    edge.parent_column,
                    edge.constraint_name
                );
                stats.skipped_null += 1;
                continue;
            }
        };

        let referenced = NodeKey::new(&edge.referenced_table, &edge.referenced_column, value.clone());
        match resolve_edge(sink, edge, &referenced, node, registry).await {
            Ok((outcome, stub)) => {
                match outcome {
                    MergeOutcome::Created => stats.created += 1,
                    MergeOutcome::Matched => stats.already_present += 1,
                }
                stubs.extend(stub);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to resolve foreign key '{}' from {referenced} to {node}: {e}",
                    edge.constraint_name
                );
                stats.failed += 1;
            }
        }
    }

    stubs
}

async fn resolve_edge<G: GraphSink>(
    sink: &G,
    edge: &ForeignKeyEdge,
    referenced: &NodeKey,
    node: &NodeKey,
    registry: &StubRegistry,
) -> Result<(MergeOutcome, Option<CreatedStub>), SinkError> {
    let existing = sink
        .match_node(&referenced.label, &referenced.key, &referenced.value)
        .await?;

    let stub = match existing {
        Some(_) => None,
        None => {
            // Another worker may create the node between the lookup and this
            // merge; the merge then just matches it.
            registry.expect(referenced);
            let outcome = sink.merge_node(referenced, &Properties::new()).await?;
            (outcome == MergeOutcome::Created).then(|| {
                tracing::debug!("Created stub node {referenced} for {node}");
                CreatedStub {
                    key: referenced.clone(),
                    created_by: format!("{}.{}", edge.parent_table, edge.constraint_name),
                }
            })
        }
    };

    let outcome = sink.merge_relationship(referenced, node, RELATED_TO).await?;
    Ok((outcome, stub))
}
