//! Node upsert engine.

use crate::error::LoadError;
use graph_sink::{GraphSink, MergeOutcome};
use sync_core::{NodeKey, Properties, TableSchema};

/// Identity of the node a row of `table` maps to.
///
/// The label is the table name and the key is the table's primary-key
/// column (column 0). Fails with [`LoadError::MissingPrimaryKey`] when the
/// row has no non-null value there.
pub fn node_identity(table: &TableSchema, properties: &Properties) -> Result<NodeKey, LoadError> {
    let missing = || LoadError::MissingPrimaryKey {
        table: table.name.clone(),
        column: table.primary_key().unwrap_or_default().to_string(),
    };

    let column = table.primary_key().ok_or_else(missing)?;
    match properties.get(column) {
        Some(value) if !value.is_null() => Ok(NodeKey::new(&table.name, column, value.clone())),
        _ => Err(missing()),
    }
}

/// Create the node for a row, or merge the row into the existing node with
/// the same `(label, primary key value)`.
///
/// A stub created earlier for the same identity is completed in place.
/// Null properties never erase stored values, so repeating the call with the
/// same input leaves the store unchanged.
pub async fn upsert_node<G: GraphSink>(
    sink: &G,
    table: &TableSchema,
    properties: &Properties,
) -> Result<(NodeKey, MergeOutcome), LoadError> {
    let identity = node_identity(table, properties)?;
    let outcome = sink.merge_node(&identity, properties).await?;
    Ok((identity, outcome))
}
