//! PostgreSQL client utilities
//!
//! This module provides utilities for creating PostgreSQL client connections.

use relational_source::SourceError;
use std::time::Duration;
use tokio_postgres::{Client, NoTls};

/// Default number of connection attempts
const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
/// Default delay between attempts in seconds
const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// Create a new PostgreSQL client, retrying transient connection failures.
pub async fn new_postgresql_client(connection_string: &str) -> Result<Client, SourceError> {
    new_postgresql_client_with_retries(
        connection_string,
        DEFAULT_RETRY_ATTEMPTS,
        DEFAULT_RETRY_DELAY_SECS,
    )
    .await
}

/// Create a new PostgreSQL client with configurable retries.
///
/// The connection task is spawned onto the runtime and ends when the
/// returned `Client` is dropped.
pub async fn new_postgresql_client_with_retries(
    connection_string: &str,
    max_retries: u32,
    retry_delay_secs: u64,
) -> Result<Client, SourceError> {
    let mut last_error = None;

    for attempt in 1..=max_retries.max(1) {
        match tokio_postgres::connect(connection_string, NoTls).await {
            Ok((client, connection)) => {
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!("PostgreSQL connection error: {e}");
                    }
                });
                if attempt > 1 {
                    tracing::info!("Connected to PostgreSQL after {attempt} attempts");
                }
                return Ok(client);
            }
            Err(e) => {
                if attempt < max_retries {
                    tracing::warn!(
                        "Failed to connect to PostgreSQL (attempt {}/{}): {}. Retrying in {}s...",
                        attempt,
                        max_retries,
                        e,
                        retry_delay_secs
                    );
                    tokio::time::sleep(Duration::from_secs(retry_delay_secs)).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(SourceError::Connection(format!(
        "failed to connect to PostgreSQL after {} attempts: {}",
        max_retries.max(1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}
