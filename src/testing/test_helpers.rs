//! Shared helpers for end-to-end tests against real PostgreSQL and Neo4j.

use std::sync::atomic::{AtomicU64, Ordering};

// Generate unique test identifiers for parallel execution
static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique test identifier for parallel test execution
pub fn generate_test_id() -> u64 {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    timestamp.wrapping_add(counter)
}

/// Connection settings for end-to-end tests.
#[derive(Clone, Debug)]
pub struct TestConfig {
    pub postgresql_url: String,
    pub neo4j_uri: String,
    pub neo4j_username: String,
    pub neo4j_password: String,
    /// Per-test schema, so parallel tests never see each other's tables
    pub schema: String,
}

impl TestConfig {
    /// Read `POSTGRESQL_TEST_URL` and `NEO4J_TEST_URL`, falling back to the
    /// service names of the development containers.
    pub fn new(test_id: u64) -> Self {
        let postgresql_url = std::env::var("POSTGRESQL_TEST_URL").unwrap_or_else(|_| {
            "host=postgresql user=postgres password=postgres dbname=testdb".to_string()
        });
        let neo4j_uri =
            std::env::var("NEO4J_TEST_URL").unwrap_or_else(|_| "bolt://neo4j:7687".to_string());

        TestConfig {
            postgresql_url,
            neo4j_uri,
            neo4j_username: "neo4j".to_string(),
            neo4j_password: "password".to_string(),
            schema: format!("sgs_test_{test_id}"),
        }
    }

    pub fn neo4j_opts(&self) -> neo4j_sink::Neo4jOpts {
        neo4j_sink::Neo4jOpts {
            uri: self.neo4j_uri.clone(),
            username: self.neo4j_username.clone(),
            password: self.neo4j_password.clone(),
            database: "neo4j".to_string(),
        }
    }
}
