//! `GraphSink` implementation for Neo4j.

use crate::cypher;
use crate::forward::{graph_value_to_bolt, properties_to_bolt};
use crate::reverse::node_from_bolt;
use graph_sink::{GraphSink, MergeOutcome, SinkError};
use neo4rs::{query, BoltType, Graph, Query, Row};
use std::fmt::Display;
use std::time::Duration;
use sync_core::{GraphValue, Node, NodeKey, Properties};
use tokio::time::sleep;

/// Maximum number of retries for transient failures
const MAX_RETRIES: u32 = 5;
/// Base delay between retries (doubled per attempt for backoff)
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Check if an error is worth retrying: transient server errors (deadlocks,
/// lock timeouts, leader switches) and dropped connections.
fn is_retriable_error(error: &neo4rs::Error) -> bool {
    let error_str = error.to_string().to_lowercase();
    error_str.contains("transienterror")
        || error_str.contains("deadlock")
        || error_str.contains("connection")
        || error_str.contains("broken pipe")
        || error_str.contains("unexpected eof")
}

/// Graph sink writing to Neo4j with `MERGE`.
///
/// Each operation is one auto-commit statement, so a node or relationship
/// merge is atomic on the server. Combined with the uniqueness constraints
/// created by [`GraphSink::ensure_identity`] this keeps concurrent merges on
/// the same identity from producing duplicates.
pub struct Neo4jSink {
    graph: Graph,
}

impl Neo4jSink {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    /// Number of nodes carrying `label`.
    pub async fn count_nodes(&self, label: &str) -> Result<i64, SinkError> {
        let cypher = cypher::count_nodes(label)?;
        self.fetch_count(label, || query(&cypher)).await
    }

    /// Delete every node carrying `label`, with its relationships.
    pub async fn delete_label(&self, label: &str) -> Result<(), SinkError> {
        let cypher = cypher::delete_label(label)?;
        self.fetch_rows("delete_label", &label, || query(&cypher))
            .await
            .map(|_| ())
    }

    async fn fetch_count(
        &self,
        subject: &str,
        build: impl Fn() -> Query,
    ) -> Result<i64, SinkError> {
        let rows = self.fetch_rows("count", &subject, build).await?;
        match rows.first() {
            Some(row) => row.get::<i64>("count").map_err(SinkError::backend),
            None => Ok(0),
        }
    }

    /// Run a statement and collect its rows, retrying transient failures
    /// with exponential backoff.
    ///
    /// `build` is called once per attempt; a `Query` is consumed by the
    /// driver.
    async fn fetch_rows(
        &self,
        operation: &str,
        subject: &(dyn Display + Sync),
        build: impl Fn() -> Query,
    ) -> Result<Vec<Row>, SinkError> {
        let mut last_error: Option<neo4rs::Error> = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay_ms = RETRY_BASE_DELAY_MS * (1 << (attempt - 1).min(4)); // max 1.6s
                tracing::warn!(
                    "Retrying {} for {} (attempt {}/{}), waiting {}ms",
                    operation,
                    subject,
                    attempt,
                    MAX_RETRIES,
                    delay_ms
                );
                sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.try_fetch_rows(build()).await {
                Ok(rows) => return Ok(rows),
                Err(e) if is_retriable_error(&e) => {
                    tracing::warn!("Retriable Neo4j error during {operation} for {subject}: {e}");
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::error!("Neo4j {operation} failed for {subject}: {e}");
                    return Err(SinkError::backend(e));
                }
            }
        }

        let error_msg = format!(
            "{operation} for {subject} failed after {MAX_RETRIES} retries. Last error: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        );
        tracing::error!("{error_msg}");
        Err(SinkError::Backend(error_msg))
    }

    async fn try_fetch_rows(&self, q: Query) -> Result<Vec<Row>, neo4rs::Error> {
        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}

fn merge_outcome(rows: &[Row], subject: &(dyn Display + Sync)) -> Result<MergeOutcome, SinkError> {
    let row = rows
        .first()
        .ok_or_else(|| SinkError::Backend(format!("merge of {subject} returned no result")))?;
    let created = row.get::<bool>("created").map_err(SinkError::backend)?;
    Ok(if created {
        MergeOutcome::Created
    } else {
        MergeOutcome::Matched
    })
}

fn reject_null_identity(identity: &NodeKey) -> Result<(), SinkError> {
    if identity.value.is_null() {
        return Err(SinkError::UnsupportedValue {
            property: identity.key.clone(),
            reason: "identity value is null".to_string(),
        });
    }
    Ok(())
}

#[async_trait::async_trait]
impl GraphSink for Neo4jSink {
    async fn ensure_identity(&self, label: &str, key: &str) -> Result<(), SinkError> {
        let cypher = cypher::identity_constraint(label, key)?;
        tracing::debug!("Ensuring identity constraint: {cypher}");
        self.fetch_rows("ensure_identity", &format!("{label}.{key}"), || query(&cypher))
            .await?;
        Ok(())
    }

    async fn match_node(
        &self,
        label: &str,
        key: &str,
        value: &GraphValue,
    ) -> Result<Option<Node>, SinkError> {
        if value.is_null() {
            return Ok(None);
        }
        let cypher = cypher::match_node(label, key)?;
        let bolt_value = graph_value_to_bolt(value);
        let subject = NodeKey::new(label, key, value.clone());
        let rows = self
            .fetch_rows("match_node", &subject, || {
                query(&cypher).param("value", bolt_value.clone())
            })
            .await?;

        match rows.first() {
            Some(row) => {
                let node: neo4rs::Node = row.get("n").map_err(SinkError::backend)?;
                Ok(Some(node_from_bolt(label, node)?))
            }
            None => Ok(None),
        }
    }

    async fn merge_node(
        &self,
        identity: &NodeKey,
        properties: &Properties,
    ) -> Result<MergeOutcome, SinkError> {
        reject_null_identity(identity)?;
        let cypher = cypher::merge_node(&identity.label, &identity.key)?;
        let key = graph_value_to_bolt(&identity.value);
        let props = properties_to_bolt(properties);

        let rows = self
            .fetch_rows("merge_node", identity, || {
                query(&cypher)
                    .param("key", key.clone())
                    .param("props", BoltType::Map(props.clone()))
            })
            .await?;
        let outcome = merge_outcome(&rows, identity)?;
        tracing::trace!("merge_node {identity}: {outcome:?}");
        Ok(outcome)
    }

    async fn merge_relationship(
        &self,
        source: &NodeKey,
        target: &NodeKey,
        rel_type: &str,
    ) -> Result<MergeOutcome, SinkError> {
        reject_null_identity(source)?;
        reject_null_identity(target)?;
        let cypher = cypher::merge_relationship(source, target, rel_type)?;
        let source_key = graph_value_to_bolt(&source.value);
        let target_key = graph_value_to_bolt(&target.value);
        let subject = format!("{source}-[{rel_type}]->{target}");

        let rows = self
            .fetch_rows("merge_relationship", &subject, || {
                query(&cypher)
                    .param("source_key", source_key.clone())
                    .param("target_key", target_key.clone())
            })
            .await?;

        if rows.is_empty() {
            // One of the MATCH clauses found nothing; report which.
            let source_exists = self
                .match_node(&source.label, &source.key, &source.value)
                .await?
                .is_some();
            let missing = if source_exists { target } else { source };
            return Err(SinkError::MissingEndpoint(missing.clone()));
        }
        let outcome = merge_outcome(&rows, &subject)?;
        tracing::trace!("merge_relationship {subject}: {outcome:?}");
        Ok(outcome)
    }
}
