//! Graph-side identities.

use crate::row::Properties;
use crate::values::GraphValue;
use serde::Serialize;
use std::fmt;

/// Relationship type used for every foreign-key edge.
pub const RELATED_TO: &str = "RELATED_TO";

/// Identity of a graph node: label plus the one property that keys it.
///
/// For nodes built from rows `key` is the table's primary-key column; for stub
/// nodes it is the referenced column of the foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeKey {
    pub label: String,
    pub key: String,
    pub value: GraphValue,
}

impl NodeKey {
    pub fn new(label: impl Into<String>, key: impl Into<String>, value: GraphValue) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            value,
        }
    }

    /// The key with an integral float value turned into an integer.
    ///
    /// Graph stores compare numbers across types (`7 = 7.0`), so two keys
    /// that differ only that way name the same node.
    pub fn normalized(&self) -> NodeKey {
        let value = match self.value {
            GraphValue::Float(f)
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                GraphValue::Int(f as i64)
            }
            ref other => other.clone(),
        };
        NodeKey::new(self.label.clone(), self.key.clone(), value)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{}={})", self.label, self.key, self.value)
    }
}

/// A node as read back from a graph store.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub label: String,
    pub properties: Properties,
}

impl Node {
    pub fn new(label: impl Into<String>, properties: Properties) -> Self {
        Self {
            label: label.into(),
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_key_display() {
        let key = NodeKey::new("Customers", "id", GraphValue::Int(7));
        assert_eq!(key.to_string(), "(Customers:id=7)");
    }

    #[test]
    fn test_normalized_merges_integral_floats() {
        let float = NodeKey::new("Customers", "id", GraphValue::Float(7.0));
        assert_eq!(float.normalized(), NodeKey::new("Customers", "id", GraphValue::Int(7)));

        let fractional = NodeKey::new("Customers", "id", GraphValue::Float(7.5));
        assert_eq!(fractional.normalized(), fractional);
        let huge = NodeKey::new("Customers", "id", GraphValue::Float(1e30));
        assert_eq!(huge.normalized(), huge);
    }
}
