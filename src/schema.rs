//! Schema extraction: the foreign-key edge set a load resolves against.

use crate::error::LoadError;
use relational_source::TableSource;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use sync_core::ForeignKeyEdge;

/// What to do with foreign keys whose referenced table lives outside the
/// schema being loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExternalReferencePolicy {
    /// Keep the edge; referenced nodes are created as stubs and reported as
    /// dangling after the load.
    #[default]
    Stub,
    /// Drop the edge at extraction time.
    Skip,
}

/// Immutable set of foreign-key edges, indexed by parent table.
///
/// Built once before any row is processed and shared by reference between
/// table workers.
#[derive(Debug, Clone, Default)]
pub struct EdgeSet {
    by_parent: HashMap<String, Vec<ForeignKeyEdge>>,
    composite_constraints: BTreeSet<String>,
    external_edges_skipped: usize,
}

impl EdgeSet {
    /// Build an edge set from raw edges without any filtering.
    pub fn new(edges: impl IntoIterator<Item = ForeignKeyEdge>) -> Self {
        let mut set = Self::default();
        for edge in edges {
            set.insert(edge);
        }
        set
    }

    fn insert(&mut self, edge: ForeignKeyEdge) {
        self.by_parent
            .entry(edge.parent_table.clone())
            .or_default()
            .push(edge);
    }

    /// Edges whose parent table is `table`.
    pub fn edges_for(&self, table: &str) -> &[ForeignKeyEdge] {
        self.by_parent.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every edge, grouped by parent table.
    pub fn iter(&self) -> impl Iterator<Item = &ForeignKeyEdge> {
        self.by_parent.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_parent.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct `(referenced_schema, referenced_table, referenced_column)`
    /// triples; these are the identities stub nodes are merged on.
    pub fn referenced_identities(&self) -> BTreeSet<(String, String, String)> {
        self.iter()
            .map(|e| {
                (
                    e.referenced_schema.clone(),
                    e.referenced_table.clone(),
                    e.referenced_column.clone(),
                )
            })
            .collect()
    }

    /// Names of constraints spanning more than one column pair, qualified
    /// as `table.constraint`.
    pub fn composite_constraints(&self) -> impl Iterator<Item = &str> {
        self.composite_constraints.iter().map(String::as_str)
    }

    /// Number of edges dropped under [`ExternalReferencePolicy::Skip`].
    pub fn external_edges_skipped(&self) -> usize {
        self.external_edges_skipped
    }
}

/// Read the foreign-key edges of `schema`.
///
/// A composite constraint yields one edge per column pair and a warning.
/// Failure to read the metadata is fatal for the load.
pub async fn extract_edge_set<T: TableSource>(
    source: &T,
    schema: &str,
    policy: ExternalReferencePolicy,
) -> Result<EdgeSet, LoadError> {
    let edges = source
        .foreign_keys(schema)
        .await
        .map_err(|source| LoadError::SchemaIntrospection {
            schema: schema.to_string(),
            source,
        })?;

    let mut set = EdgeSet::default();
    for edge in edges {
        if edge.position > 1 {
            let qualified = format!("{}.{}", edge.parent_table, edge.constraint_name);
            if set.composite_constraints.insert(qualified) {
                tracing::warn!(
                    "Foreign key '{}' on table '{}' spans several columns; each column pair becomes its own edge",
                    edge.constraint_name,
                    edge.parent_table
                );
            }
        }

        if edge.referenced_schema != schema {
            match policy {
                ExternalReferencePolicy::Skip => {
                    tracing::warn!(
                        "Skipping foreign key '{}' from {}.{} to external table {}.{}",
                        edge.constraint_name,
                        edge.parent_table,
                        edge.parent_column,
                        edge.referenced_schema,
                        edge.referenced_table
                    );
                    set.external_edges_skipped += 1;
                    continue;
                }
                ExternalReferencePolicy::Stub => {
                    tracing::warn!(
                        "Foreign key '{}' references table {}.{} outside schema '{}'; its nodes will stay stubs",
                        edge.constraint_name,
                        edge.referenced_schema,
                        edge.referenced_table,
                        schema
                    );
                }
            }
        }

        set.insert(edge);
    }

    tracing::info!(
        "Extracted {} foreign-key edges from schema '{}'",
        set.len(),
        schema
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemorySource;

    fn orders_to_customers() -> ForeignKeyEdge {
        ForeignKeyEdge::new(
            "public",
            "orders_customer_fk",
            ("orders", "customer_id"),
            ("customers", "id"),
        )
    }

    #[test]
    fn test_edges_are_indexed_by_parent() {
        let set = EdgeSet::new([orders_to_customers()]);
        assert_eq!(set.edges_for("orders").len(), 1);
        assert!(set.edges_for("customers").is_empty());
        assert_eq!(
            set.referenced_identities().into_iter().collect::<Vec<_>>(),
            vec![(
                "public".to_string(),
                "customers".to_string(),
                "id".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_composite_constraint_yields_edge_per_pair() {
        let mut second = orders_to_customers();
        second.constraint_name = "line_fk".to_string();
        second.parent_table = "order_lines".to_string();
        second.parent_column = "order_region".to_string();
        second.referenced_table = "orders".to_string();
        second.referenced_column = "region".to_string();
        second.position = 2;
        let mut first = second.clone();
        first.parent_column = "order_id".to_string();
        first.referenced_column = "id".to_string();
        first.position = 1;

        let source = MemorySource::new()
            .with_foreign_key(first)
            .with_foreign_key(second);
        let set = extract_edge_set(&source, "public", ExternalReferencePolicy::Stub)
            .await
            .unwrap();

        assert_eq!(set.edges_for("order_lines").len(), 2);
        assert_eq!(
            set.composite_constraints().collect::<Vec<_>>(),
            vec!["order_lines.line_fk"]
        );
    }

    #[tokio::test]
    async fn test_external_reference_policy() {
        let external = ForeignKeyEdge::new(
            "billing",
            "orders_invoice_fk",
            ("orders", "invoice_id"),
            ("invoices", "id"),
        );
        let source = MemorySource::new()
            .with_foreign_key(orders_to_customers())
            .with_foreign_key(external);

        let kept = extract_edge_set(&source, "public", ExternalReferencePolicy::Stub)
            .await
            .unwrap();
        assert_eq!(kept.edges_for("orders").len(), 2);
        assert_eq!(kept.external_edges_skipped(), 0);

        let skipped = extract_edge_set(&source, "public", ExternalReferencePolicy::Skip)
            .await
            .unwrap();
        assert_eq!(skipped.edges_for("orders").len(), 1);
        assert_eq!(skipped.external_edges_skipped(), 1);
    }

    #[tokio::test]
    async fn test_metadata_failure_is_fatal() {
        let source = MemorySource::new().with_failing_foreign_keys("permission denied");
        let err = extract_edge_set(&source, "public", ExternalReferencePolicy::Stub)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::SchemaIntrospection { .. }));
    }
}
