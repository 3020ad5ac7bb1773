//! Cypher statement construction.
//!
//! Identifiers cannot be bound as parameters in Cypher, so labels, property
//! keys and relationship types are quoted into the text here. Every value
//! travels as a parameter: `$key` for the identity value, `$props` for the
//! property map, `$source_key` / `$target_key` for relationship endpoints.

use graph_sink::SinkError;
use sync_core::NodeKey;

/// Quote a Cypher identifier with backticks, doubling embedded backticks.
///
/// Empty identifiers are rejected; Neo4j has no way to express them.
pub fn quote_identifier(name: &str) -> Result<String, SinkError> {
    if name.is_empty() {
        return Err(SinkError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Property set by `ON CREATE` and removed again by the same statement, so
/// the merge itself reports whether it created the entity.
const CREATED_MARKER: &str = "`__sgs_created`";

/// Node merge returning whether this statement created the node.
///
/// With an empty `$props` map this creates a stub carrying only the
/// identity property.
pub fn merge_node(label: &str, key: &str) -> Result<String, SinkError> {
    let label = quote_identifier(label)?;
    let key = quote_identifier(key)?;
    Ok(format!(
        "MERGE (n:{label} {{{key}: $key}}) \
         ON CREATE SET n.{CREATED_MARKER} = true \
         WITH n, n.{CREATED_MARKER} IS NOT NULL AS created \
         REMOVE n.{CREATED_MARKER} \
         SET n += $props \
         RETURN created"
    ))
}

/// Relationship merge between two nodes matched by identity.
///
/// Yields no row when either endpoint is missing.
pub fn merge_relationship(
    source: &NodeKey,
    target: &NodeKey,
    rel_type: &str,
) -> Result<String, SinkError> {
    let source_label = quote_identifier(&source.label)?;
    let source_key = quote_identifier(&source.key)?;
    let target_label = quote_identifier(&target.label)?;
    let target_key = quote_identifier(&target.key)?;
    let rel_type = quote_identifier(rel_type)?;
    Ok(format!(
        "MATCH (a:{source_label} {{{source_key}: $source_key}}) \
         MATCH (b:{target_label} {{{target_key}: $target_key}}) \
         MERGE (a)-[r:{rel_type}]->(b) \
         ON CREATE SET r.{CREATED_MARKER} = true \
         WITH r, r.{CREATED_MARKER} IS NOT NULL AS created \
         REMOVE r.{CREATED_MARKER} \
         RETURN created"
    ))
}

/// Lookup of one node by an arbitrary property.
pub fn match_node(label: &str, key: &str) -> Result<String, SinkError> {
    let label = quote_identifier(label)?;
    let key = quote_identifier(key)?;
    Ok(format!("MATCH (n:{label} {{{key}: $value}}) RETURN n LIMIT 1"))
}

/// Idempotent uniqueness constraint on `(label, key)`.
pub fn identity_constraint(label: &str, key: &str) -> Result<String, SinkError> {
    let label = quote_identifier(label)?;
    let key = quote_identifier(key)?;
    Ok(format!(
        "CREATE CONSTRAINT IF NOT EXISTS FOR (n:{label}) REQUIRE n.{key} IS UNIQUE"
    ))
}

pub fn count_nodes(label: &str) -> Result<String, SinkError> {
    let label = quote_identifier(label)?;
    Ok(format!("MATCH (n:{label}) RETURN count(n) AS count"))
}

pub fn delete_label(label: &str) -> Result<String, SinkError> {
    let label = quote_identifier(label)?;
    Ok(format!("MATCH (n:{label}) DETACH DELETE n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::{GraphValue, RELATED_TO};

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Customers").unwrap(), "`Customers`");
        assert_eq!(quote_identifier("order items").unwrap(), "`order items`");
        assert_eq!(quote_identifier("we`ird").unwrap(), "`we``ird`");
        assert!(matches!(
            quote_identifier(""),
            Err(SinkError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_merge_node_binds_values() {
        let cypher = merge_node("customers", "id").unwrap();
        assert!(cypher.contains("MERGE (n:`customers` {`id`: $key})"));
        assert!(cypher.contains("SET n += $props"));
        assert!(cypher.ends_with("RETURN created"));
    }

    #[test]
    fn test_created_flag_comes_from_the_merge_itself() {
        let cypher = merge_node("customers", "id").unwrap();
        assert!(!cypher.contains("OPTIONAL MATCH"));
        let merge = cypher.find("MERGE").unwrap();
        let on_create = cypher.find("ON CREATE SET n.`__sgs_created` = true").unwrap();
        let remove = cypher.find("REMOVE n.`__sgs_created`").unwrap();
        assert!(merge < on_create && on_create < remove);
    }

    #[test]
    fn test_merge_relationship_matches_both_endpoints() {
        let source = NodeKey::new("customers", "id", GraphValue::Int(7));
        let target = NodeKey::new("orders", "order_id", GraphValue::Int(1));
        let cypher = merge_relationship(&source, &target, RELATED_TO).unwrap();

        assert!(cypher.contains("MATCH (a:`customers` {`id`: $source_key})"));
        assert!(cypher.contains("MATCH (b:`orders` {`order_id`: $target_key})"));
        assert!(cypher.contains("MERGE (a)-[r:`RELATED_TO`]->(b) ON CREATE SET r.`__sgs_created` = true"));
        assert!(cypher.ends_with("RETURN created"));
    }

    #[test]
    fn test_identity_constraint() {
        assert_eq!(
            identity_constraint("customers", "id").unwrap(),
            "CREATE CONSTRAINT IF NOT EXISTS FOR (n:`customers`) REQUIRE n.`id` IS UNIQUE"
        );
    }

    #[test]
    fn test_injection_stays_inside_identifier() {
        let cypher = match_node("x`) DETACH DELETE (n", "id").unwrap();
        assert!(cypher.starts_with("MATCH (n:`x``) DETACH DELETE (n` {`id`: $value})"));
    }
}
