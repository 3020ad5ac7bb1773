//! PostgreSQL source for sql-graph-sync
//!
//! Implements `relational_source::TableSource` on top of `tokio-postgres`:
//! foreign-key metadata from `pg_constraint`, base tables from
//! `information_schema.tables`, key columns from `information_schema.columns`,
//! and incremental row scans via `query_raw`.

mod client;
mod source;
mod value;

pub use client::{new_postgresql_client, new_postgresql_client_with_retries};
pub use source::{quote_identifier, PostgresSource};
pub use value::{convert_postgres_value, convert_row, is_supported_type};
