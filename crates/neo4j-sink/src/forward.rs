//! Forward conversion: `GraphValue` → Bolt parameter values.
//!
//! Values are bound as query parameters, never rendered into Cypher text, so
//! every scalar keeps its native Bolt type. `DateTime` becomes a zoned Bolt
//! datetime at UTC.

use neo4rs::{
    BoltBoolean, BoltDateTime, BoltFloat, BoltInteger, BoltMap, BoltNull, BoltString, BoltType,
};
use sync_core::{GraphValue, Properties};

/// Convert one property value to its Bolt representation.
pub fn graph_value_to_bolt(value: &GraphValue) -> BoltType {
    match value {
        GraphValue::Null => BoltType::Null(BoltNull),
        GraphValue::Int(i) => BoltType::Integer(BoltInteger::new(*i)),
        GraphValue::Float(f) => BoltType::Float(BoltFloat::new(*f)),
        GraphValue::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        GraphValue::String(s) => BoltType::String(BoltString::new(s)),
        GraphValue::DateTime(dt) => BoltType::DateTime(BoltDateTime::from(dt.fixed_offset())),
    }
}

/// Build the `$props` map for a node merge.
///
/// Null entries are left out: Neo4j cannot store a null property, and
/// `SET n += {k: null}` would remove an existing one.
pub fn properties_to_bolt(properties: &Properties) -> BoltMap {
    let mut map = BoltMap::new();
    for (key, value) in properties.non_null() {
        map.put(BoltString::new(key), graph_value_to_bolt(value));
    }
    map
}
