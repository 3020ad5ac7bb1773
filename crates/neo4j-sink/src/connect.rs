//! Neo4j connection setup.

use graph_sink::SinkError;
use neo4rs::{query, ConfigBuilder, Graph};
use std::time::Duration;

/// Default number of connection attempts
const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
/// Default delay between attempts in seconds
const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// Connection options for the target Neo4j database.
#[derive(Debug, Clone)]
pub struct Neo4jOpts {
    /// Bolt URI (e.g., "bolt://localhost:7687")
    pub uri: String,
    pub username: String,
    pub password: String,
    /// Database name (typically "neo4j")
    pub database: String,
}

impl Default for Neo4jOpts {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
        }
    }
}

/// Connect to Neo4j, retrying transient failures.
pub async fn connect(opts: &Neo4jOpts) -> Result<Graph, SinkError> {
    connect_with_retries(opts, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_SECS).await
}

/// Connect to Neo4j with configurable retries.
///
/// The driver connects lazily, so each attempt also runs a trivial query to
/// prove the server is reachable and the credentials are accepted.
pub async fn connect_with_retries(
    opts: &Neo4jOpts,
    max_retries: u32,
    retry_delay_secs: u64,
) -> Result<Graph, SinkError> {
    let max_retries = max_retries.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_retries {
        let config = ConfigBuilder::default()
            .uri(&opts.uri)
            .user(opts.username.as_str())
            .password(opts.password.as_str())
            .db(opts.database.as_str())
            .build()
            .map_err(|e| SinkError::Backend(format!("invalid Neo4j configuration: {e}")))?;

        let result = match Graph::connect(config) {
            Ok(graph) => graph.run(query("RETURN 1")).await.map(|_| graph),
            Err(e) => Err(e),
        };

        match result {
            Ok(graph) => {
                if attempt > 1 {
                    tracing::info!("Connected to Neo4j after {attempt} attempts");
                }
                tracing::debug!("Neo4j connection established to {}", opts.uri);
                return Ok(graph);
            }
            Err(e) => {
                if attempt < max_retries {
                    tracing::warn!(
                        "Failed to connect to Neo4j at {} (attempt {}/{}): {}. Retrying in {}s...",
                        opts.uri,
                        attempt,
                        max_retries,
                        e,
                        retry_delay_secs
                    );
                    tokio::time::sleep(Duration::from_secs(retry_delay_secs)).await;
                }
                last_error = e.to_string();
            }
        }
    }

    Err(SinkError::Backend(format!(
        "failed to connect to Neo4j at {} after {max_retries} attempts: {last_error}",
        opts.uri
    )))
}
