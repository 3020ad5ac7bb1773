//! `TableSource` implementation for PostgreSQL.

use crate::client::new_postgresql_client;
use crate::value::{convert_row, is_supported_type};
use futures::{stream, StreamExt};
use relational_source::{SourceError, TableScan, TableSource};
use std::sync::Arc;
use sync_core::{ForeignKeyEdge, TableSchema};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Row};

/// One row per foreign-key column pair, composite constraints unnested in
/// column order.
const FOREIGN_KEYS_QUERY: &str = "
    SELECT
        c.conname AS constraint_name,
        pc.relname AS parent_table,
        pa.attname AS parent_column,
        rn.nspname AS referenced_schema,
        rc.relname AS referenced_table,
        ra.attname AS referenced_column,
        k.ord AS column_position
    FROM pg_constraint c
    JOIN pg_class pc ON pc.oid = c.conrelid
    JOIN pg_namespace pn ON pn.oid = pc.relnamespace
    JOIN pg_class rc ON rc.oid = c.confrelid
    JOIN pg_namespace rn ON rn.oid = rc.relnamespace
    CROSS JOIN LATERAL unnest(c.conkey, c.confkey)
        WITH ORDINALITY AS k(parent_attnum, referenced_attnum, ord)
    JOIN pg_attribute pa ON pa.attrelid = c.conrelid AND pa.attnum = k.parent_attnum
    JOIN pg_attribute ra ON ra.attrelid = c.confrelid AND ra.attnum = k.referenced_attnum
    WHERE c.contype = 'f' AND pn.nspname = $1
    ORDER BY pc.relname, c.conname, k.ord";

const BASE_TABLES_QUERY: &str = "
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = $1 AND table_type = 'BASE TABLE'
    ORDER BY table_name";

const KEY_COLUMN_QUERY: &str = "
    SELECT column_name::text
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2
    ORDER BY ordinal_position
    LIMIT 1";

/// Quote a PostgreSQL identifier, doubling embedded double quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Select list for a scan: columns the converter cannot decode are cast to
/// text under their own name.
fn select_list<'a>(columns: impl IntoIterator<Item = (&'a str, bool)>) -> String {
    columns
        .into_iter()
        .map(|(name, supported)| {
            let quoted = quote_identifier(name);
            if supported {
                quoted
            } else {
                format!("{quoted}::text AS {quoted}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// PostgreSQL-backed relational source.
///
/// Metadata queries share one client. Every table scan opens its own
/// connection so concurrent scans do not queue behind each other on a single
/// socket; the connection lives inside the row stream and is closed when the
/// stream is dropped.
pub struct PostgresSource {
    client: Client,
    connection_string: String,
}

impl PostgresSource {
    /// Connect the metadata client.
    pub async fn connect(connection_string: &str) -> Result<Self, SourceError> {
        let client = new_postgresql_client(connection_string).await?;
        Ok(Self::with_client(client, connection_string))
    }

    /// Wrap an existing metadata client. Scans still connect with
    /// `connection_string`.
    pub fn with_client(client: Client, connection_string: &str) -> Self {
        Self {
            client,
            connection_string: connection_string.to_string(),
        }
    }
}

fn row_to_edge(row: &Row) -> Result<ForeignKeyEdge, SourceError> {
    let position: i64 = row.try_get("column_position").map_err(SourceError::query)?;
    Ok(ForeignKeyEdge {
        constraint_name: row.try_get("constraint_name").map_err(SourceError::query)?,
        parent_table: row.try_get("parent_table").map_err(SourceError::query)?,
        parent_column: row.try_get("parent_column").map_err(SourceError::query)?,
        referenced_schema: row.try_get("referenced_schema").map_err(SourceError::query)?,
        referenced_table: row.try_get("referenced_table").map_err(SourceError::query)?,
        referenced_column: row.try_get("referenced_column").map_err(SourceError::query)?,
        position: u32::try_from(position).map_err(SourceError::query)?,
    })
}

#[async_trait::async_trait]
impl TableSource for PostgresSource {
    async fn foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyEdge>, SourceError> {
        tracing::debug!("Reading foreign keys for schema '{schema}'");
        let rows = self
            .client
            .query(FOREIGN_KEYS_QUERY, &[&schema])
            .await
            .map_err(SourceError::query)?;
        rows.iter().map(row_to_edge).collect()
    }

    async fn base_tables(&self, schema: &str) -> Result<Vec<String>, SourceError> {
        let rows = self
            .client
            .query(BASE_TABLES_QUERY, &[&schema])
            .await
            .map_err(SourceError::query)?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(SourceError::query))
            .collect()
    }

    async fn key_column(&self, schema: &str, table: &str) -> Result<Option<String>, SourceError> {
        let row = self
            .client
            .query_opt(KEY_COLUMN_QUERY, &[&schema, &table])
            .await
            .map_err(SourceError::query)?;
        row.map(|row| row.try_get::<_, String>(0).map_err(SourceError::query))
            .transpose()
    }

    async fn scan_table(&self, schema: &str, table: &str) -> Result<TableScan, SourceError> {
        let client = new_postgresql_client(&self.connection_string).await?;

        let from = format!("{}.{}", quote_identifier(schema), quote_identifier(table));
        let query = format!("SELECT * FROM {from}");
        tracing::debug!("Scanning table {table} with: {query}");

        let statement = client.prepare(&query).await.map_err(|e| {
            if e.code() == Some(&SqlState::UNDEFINED_TABLE) {
                SourceError::TableNotFound(format!("{schema}.{table}"))
            } else {
                SourceError::query(e)
            }
        })?;

        let statement = if statement.columns().iter().all(|c| is_supported_type(c.type_())) {
            statement
        } else {
            for column in statement.columns() {
                if !is_supported_type(column.type_()) {
                    tracing::warn!(
                        "Column {table}.{} has type '{}'; reading it as text",
                        column.name(),
                        column.type_().name()
                    );
                }
            }
            let columns = select_list(
                statement
                    .columns()
                    .iter()
                    .map(|c| (c.name(), is_supported_type(c.type_()))),
            );
            let query = format!("SELECT {columns} FROM {from}");
            tracing::debug!("Scanning table {table} with: {query}");
            client.prepare(&query).await.map_err(SourceError::query)?
        };
        let columns: Arc<[String]> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        let row_stream = client
            .query_raw(&statement, params)
            .await
            .map_err(SourceError::query)?;

        let table_schema = TableSchema {
            name: table.to_string(),
            columns: Arc::clone(&columns),
        };

        // The client rides along with the stream to keep the connection open.
        let rows = stream::unfold(
            (client, Box::pin(row_stream), columns),
            |(client, mut row_stream, columns)| async move {
                let item = match row_stream.next().await? {
                    Ok(row) => convert_row(&columns, &row),
                    Err(e) => Err(SourceError::query(e)),
                };
                Some((item, (client, row_stream, columns)))
            },
        )
        .boxed();

        Ok(TableScan::new(table_schema, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("orders"), "\"orders\"");
        assert_eq!(quote_identifier("Order Items"), "\"Order Items\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_select_list_casts_unsupported_columns() {
        assert_eq!(
            select_list([("id", true), ("status", false), ("we\"ird", false)]),
            "\"id\", \"status\"::text AS \"status\", \"we\"\"ird\"::text AS \"we\"\"ird\""
        );
    }

    #[test]
    fn test_foreign_key_query_filters_by_parent_schema() {
        assert!(FOREIGN_KEYS_QUERY.contains("c.contype = 'f'"));
        assert!(FOREIGN_KEYS_QUERY.contains("pn.nspname = $1"));
        assert!(BASE_TABLES_QUERY.contains("'BASE TABLE'"));
        assert!(KEY_COLUMN_QUERY.contains("ORDER BY ordinal_position"));
    }
}
