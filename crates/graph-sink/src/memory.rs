//! In-memory graph store.
//!
//! Mirrors the merge semantics of the Neo4j sink closely enough that the
//! load engine behaves the same against either. All state sits behind one
//! mutex held for the duration of a single call, which makes every call
//! atomic.
//!
//! Index lookups compare numbers the way Cypher does: `7` and `7.0` are the
//! same key.

use crate::error::SinkError;
use crate::traits::{GraphSink, MergeOutcome};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use sync_core::{GraphValue, Node, NodeKey, Properties};

#[derive(Default)]
struct Inner {
    nodes: Vec<Node>,
    /// (label, property, value) -> first node holding it
    index: HashMap<NodeKey, usize>,
    edges: HashSet<(usize, usize, String)>,
    identities: HashSet<(String, String)>,
}

fn index_key(label: &str, property: &str, value: &GraphValue) -> NodeKey {
    NodeKey::new(label, property, value.clone()).normalized()
}

impl Inner {
    fn lookup(&self, key: &NodeKey) -> Option<usize> {
        self.index
            .get(&index_key(&key.label, &key.key, &key.value))
            .copied()
    }

    fn index_property(&mut self, node: usize, property: &str, value: &GraphValue) {
        if value.is_null() {
            return;
        }
        let key = index_key(&self.nodes[node].label, property, value);
        self.index.entry(key).or_insert(node);
    }

    fn unindex_property(&mut self, node: usize, property: &str, value: &GraphValue) {
        let key = index_key(&self.nodes[node].label, property, value);
        if self.index.get(&key) == Some(&node) {
            self.index.remove(&key);
        }
    }

    /// First registered identity in `properties` already held by a node
    /// other than `node`.
    fn identity_conflict(
        &self,
        label: &str,
        node: Option<usize>,
        properties: &Properties,
    ) -> Option<NodeKey> {
        properties
            .non_null()
            .filter(|(key, _)| {
                self.identities
                    .contains(&(label.to_string(), (*key).to_string()))
            })
            .map(|(key, value)| NodeKey::new(label, key, value.clone()))
            .find(|key| matches!(self.lookup(key), Some(holder) if Some(holder) != node))
    }

    fn set_properties(&mut self, node: usize, properties: &Properties) {
        for (key, value) in properties.non_null() {
            let previous = self.nodes[node].properties.get(key).cloned();
            if previous.as_ref() == Some(value) {
                continue;
            }
            if let Some(previous) = previous {
                self.unindex_property(node, key, &previous);
            }
            self.nodes[node].properties.insert(key, value.clone());
            self.index_property(node, key, value);
        }
    }
}

/// Graph store kept entirely in process memory.
#[derive(Default)]
pub struct MemoryGraph {
    inner: Mutex<Inner>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    /// Number of nodes carrying `label`.
    pub fn label_count(&self, label: &str) -> usize {
        self.lock().nodes.iter().filter(|n| n.label == label).count()
    }

    /// Total number of relationships.
    pub fn relationship_count(&self) -> usize {
        self.lock().edges.len()
    }

    /// Snapshot of the node identified by `key`.
    pub fn node(&self, key: &NodeKey) -> Option<Node> {
        let inner = self.lock();
        inner.lookup(key).map(|i| inner.nodes[i].clone())
    }

    /// Whether `source -[rel_type]-> target` exists.
    pub fn has_relationship(&self, source: &NodeKey, target: &NodeKey, rel_type: &str) -> bool {
        let inner = self.lock();
        match (inner.lookup(source), inner.lookup(target)) {
            (Some(s), Some(t)) => inner.edges.contains(&(s, t, rel_type.to_string())),
            _ => false,
        }
    }

    /// Number of relationships arriving at `target`.
    pub fn incoming_count(&self, target: &NodeKey) -> usize {
        let inner = self.lock();
        match inner.lookup(target) {
            Some(t) => inner.edges.iter().filter(|(_, to, _)| *to == t).count(),
            None => 0,
        }
    }

    /// Identity constraints registered through `ensure_identity`. Merges that
    /// would duplicate one of them fail with [`SinkError::IdentityConflict`].
    pub fn identities(&self) -> Vec<(String, String)> {
        let mut identities: Vec<_> = self.lock().identities.iter().cloned().collect();
        identities.sort();
        identities
    }
}

#[async_trait::async_trait]
impl GraphSink for MemoryGraph {
    async fn ensure_identity(&self, label: &str, key: &str) -> Result<(), SinkError> {
        self.lock()
            .identities
            .insert((label.to_string(), key.to_string()));
        Ok(())
    }

    async fn match_node(
        &self,
        label: &str,
        key: &str,
        value: &GraphValue,
    ) -> Result<Option<Node>, SinkError> {
        let inner = self.lock();
        let wanted = NodeKey::new(label, key, value.clone());
        Ok(inner.lookup(&wanted).map(|i| inner.nodes[i].clone()))
    }

    async fn merge_node(
        &self,
        identity: &NodeKey,
        properties: &Properties,
    ) -> Result<MergeOutcome, SinkError> {
        if identity.value.is_null() {
            return Err(SinkError::UnsupportedValue {
                property: identity.key.clone(),
                reason: "identity value is null".to_string(),
            });
        }

        let mut inner = self.lock();
        let existing = inner.lookup(identity);
        if let Some(conflict) = inner.identity_conflict(&identity.label, existing, properties) {
            return Err(SinkError::IdentityConflict(conflict));
        }
        if let Some(existing) = existing {
            inner.set_properties(existing, properties);
            tracing::trace!("Merged into existing node {identity}");
            return Ok(MergeOutcome::Matched);
        }

        inner.nodes.push(Node::new(
            identity.label.clone(),
            Properties::single(identity.key.clone(), identity.value.clone()),
        ));
        let created = inner.nodes.len() - 1;
        inner.index_property(created, &identity.key, &identity.value);
        inner.set_properties(created, properties);
        tracing::trace!("Created node {identity}");
        Ok(MergeOutcome::Created)
    }

    async fn merge_relationship(
        &self,
        source: &NodeKey,
        target: &NodeKey,
        rel_type: &str,
    ) -> Result<MergeOutcome, SinkError> {
        let mut inner = self.lock();
        let s = inner
            .lookup(source)
            .ok_or_else(|| SinkError::MissingEndpoint(source.clone()))?;
        let t = inner
            .lookup(target)
            .ok_or_else(|| SinkError::MissingEndpoint(target.clone()))?;

        if inner.edges.insert((s, t, rel_type.to_string())) {
            Ok(MergeOutcome::Created)
        } else {
            Ok(MergeOutcome::Matched)
        }
    }
}
