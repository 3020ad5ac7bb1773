//! Reverse conversion: Bolt values read from Neo4j → `GraphValue`.
//!
//! Only the scalar types this tool writes (plus the naive date/time variants
//! other writers commonly use) are accepted. Lists, maps, spatial and graph
//! structure values return [`SinkError::UnsupportedValue`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use graph_sink::SinkError;
use neo4rs::BoltType;
use sync_core::{GraphValue, Node, Properties};

/// Convert a Bolt property value read from `property`.
pub fn bolt_to_graph_value(property: &str, bolt: BoltType) -> Result<GraphValue, SinkError> {
    let invalid = |reason: String| SinkError::UnsupportedValue {
        property: property.to_string(),
        reason,
    };

    match bolt {
        BoltType::Null(_) => Ok(GraphValue::Null),
        BoltType::Boolean(b) => Ok(GraphValue::Bool(b.value)),
        BoltType::Integer(i) => Ok(GraphValue::Int(i.value)),
        BoltType::Float(f) => Ok(GraphValue::Float(f.value)),
        BoltType::String(s) => Ok(GraphValue::String(s.value)),
        BoltType::DateTime(dt) => {
            let dt: DateTime<FixedOffset> = dt
                .try_into()
                .map_err(|e| invalid(format!("failed to convert BoltDateTime: {e}")))?;
            Ok(GraphValue::DateTime(dt.with_timezone(&Utc)))
        }
        BoltType::DateTimeZoneId(dt_zone) => {
            let dt: DateTime<FixedOffset> = (&dt_zone)
                .try_into()
                .map_err(|e| invalid(format!("failed to convert BoltDateTimeZoneId: {e}")))?;
            Ok(GraphValue::DateTime(dt.with_timezone(&Utc)))
        }
        // Timezone-naive values are read as UTC, the same way timestamps
        // without a zone are read from the relational side.
        BoltType::LocalDateTime(local_dt) => {
            let naive: NaiveDateTime = local_dt
                .try_into()
                .map_err(|e| invalid(format!("failed to convert BoltLocalDateTime: {e}")))?;
            Ok(GraphValue::DateTime(naive.and_utc()))
        }
        BoltType::Date(date) => {
            let naive: NaiveDate = date
                .try_into()
                .map_err(|e| invalid(format!("failed to convert BoltDate: {e}")))?;
            Ok(GraphValue::DateTime(naive.and_time(NaiveTime::MIN).and_utc()))
        }
        other => Err(invalid(format!(
            "Bolt type is not a supported property value: {other:?}"
        ))),
    }
}

/// Convert a node returned by a query into a sync-core [`Node`].
///
/// `label` is the label the node was matched by; other labels it may carry
/// are ignored.
pub fn node_from_bolt(label: &str, node: neo4rs::Node) -> Result<Node, SinkError> {
    let mut properties = Properties::new();
    for key in node.keys() {
        let value = node
            .get::<BoltType>(key)
            .map_err(|e| SinkError::UnsupportedValue {
                property: key.to_string(),
                reason: e.to_string(),
            })?;
        properties.insert(key, bolt_to_graph_value(key, value)?);
    }
    Ok(Node::new(label, properties))
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo4rs::{BoltFloat, BoltInteger, BoltList, BoltNull, BoltString};

    #[test]
    fn test_scalars() {
        assert_eq!(
            bolt_to_graph_value("id", BoltType::Integer(BoltInteger::new(7))).unwrap(),
            GraphValue::Int(7)
        );
        assert_eq!(
            bolt_to_graph_value("price", BoltType::Float(BoltFloat::new(12.5))).unwrap(),
            GraphValue::Float(12.5)
        );
        assert_eq!(
            bolt_to_graph_value("name", BoltType::String(BoltString::new("Alice"))).unwrap(),
            GraphValue::from("Alice")
        );
        assert_eq!(
            bolt_to_graph_value("gone", BoltType::Null(BoltNull)).unwrap(),
            GraphValue::Null
        );
    }

    #[test]
    fn test_datetime_round_trips_through_bolt() {
        let dt = DateTime::parse_from_rfc3339("2024-03-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let bolt = crate::forward::graph_value_to_bolt(&GraphValue::DateTime(dt));
        assert_eq!(
            bolt_to_graph_value("created_at", bolt).unwrap(),
            GraphValue::DateTime(dt)
        );
    }

    #[test]
    fn test_list_is_rejected() {
        let err = bolt_to_graph_value("tags", BoltType::List(BoltList::new())).unwrap_err();
        match err {
            SinkError::UnsupportedValue { property, .. } => assert_eq!(property, "tags"),
            other => panic!("Expected UnsupportedValue, got {other:?}"),
        }
    }
}
