//! Relational schema metadata: table column layouts and foreign-key edges.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Column layout of one table.
///
/// The column at index 0 is treated as the primary key. This is a naming
/// convention, not introspected from constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Arc<[String]>,
}

impl TableSchema {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Designated primary-key column, `None` for a table without columns.
    pub fn primary_key(&self) -> Option<&str> {
        self.columns.first().map(String::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// A directed single-column foreign-key constraint.
///
/// Composite constraints are represented as one edge per column pair, told
/// apart by `position`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    pub constraint_name: String,
    pub parent_table: String,
    pub parent_column: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// 1-based position of this column pair inside its constraint
    pub position: u32,
}

impl ForeignKeyEdge {
    /// Build a single-column edge whose referenced table lives in `schema`.
    pub fn new(
        schema: &str,
        constraint_name: &str,
        parent: (&str, &str),
        referenced: (&str, &str),
    ) -> Self {
        Self {
            constraint_name: constraint_name.to_string(),
            parent_table: parent.0.to_string(),
            parent_column: parent.1.to_string(),
            referenced_schema: schema.to_string(),
            referenced_table: referenced.0.to_string(),
            referenced_column: referenced.1.to_string(),
            position: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_is_first_column() {
        let table = TableSchema::new("orders", ["order_id", "customer_id"]);
        assert_eq!(table.primary_key(), Some("order_id"));
        assert!(table.has_column("customer_id"));

        let empty = TableSchema::new("empty", Vec::<String>::new());
        assert_eq!(empty.primary_key(), None);
    }
}
