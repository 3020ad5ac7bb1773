//! In-memory `TableSource` for tests and examples.

use futures::{stream, StreamExt};
use relational_source::{SourceError, TableScan, TableSource};
use std::sync::Arc;
use sync_core::{ForeignKeyEdge, SourceRow, SourceValue, TableSchema};

#[derive(Debug, Clone)]
enum MemoryRow {
    Values(Vec<SourceValue>),
    /// Row whose column cannot be converted
    Unreadable { column: String },
    /// Stream failure; the scan ends here
    StreamError(String),
}

#[derive(Debug, Clone)]
struct MemoryTable {
    schema: TableSchema,
    rows: Vec<MemoryRow>,
    scan_error: Option<String>,
}

/// Relational source backed by vectors.
///
/// Tables are listed in insertion order, which lets tests control the
/// processing order. Failures are injected with the `with_failing_*`,
/// `with_unreadable_row` and `with_stream_error` builders.
#[derive(Debug, Clone)]
pub struct MemorySource {
    schema: String,
    tables: Vec<MemoryTable>,
    foreign_keys: Vec<ForeignKeyEdge>,
    foreign_keys_error: Option<String>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            tables: Vec::new(),
            foreign_keys: Vec::new(),
            foreign_keys_error: None,
        }
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. Each row lists values in column order.
    pub fn with_table(mut self, name: &str, columns: &[&str], rows: Vec<Vec<SourceValue>>) -> Self {
        self.tables.push(MemoryTable {
            schema: TableSchema::new(name, columns.iter().copied()),
            rows: rows.into_iter().map(MemoryRow::Values).collect(),
            scan_error: None,
        });
        self
    }

    pub fn with_foreign_key(mut self, edge: ForeignKeyEdge) -> Self {
        self.foreign_keys.push(edge);
        self
    }

    /// Shorthand for a single-column foreign key within the source schema.
    pub fn with_reference(self, constraint: &str, parent: (&str, &str), referenced: (&str, &str)) -> Self {
        let schema = self.schema.clone();
        self.with_foreign_key(ForeignKeyEdge::new(&schema, constraint, parent, referenced))
    }

    /// Make `foreign_keys` fail.
    pub fn with_failing_foreign_keys(mut self, message: &str) -> Self {
        self.foreign_keys_error = Some(message.to_string());
        self
    }

    /// Make `scan_table` fail for `table`.
    pub fn with_failing_scan(mut self, table: &str, message: &str) -> Self {
        if let Some(t) = self.table_mut(table) {
            t.scan_error = Some(message.to_string());
        }
        self
    }

    /// Append a row to `table` whose `column` has an unsupported type.
    pub fn with_unreadable_row(mut self, table: &str, column: &str) -> Self {
        if let Some(t) = self.table_mut(table) {
            t.rows.push(MemoryRow::Unreadable {
                column: column.to_string(),
            });
        }
        self
    }

    /// Append a stream failure to `table`; rows added afterwards are never
    /// read.
    pub fn with_stream_error(mut self, table: &str, message: &str) -> Self {
        if let Some(t) = self.table_mut(table) {
            t.rows.push(MemoryRow::StreamError(message.to_string()));
        }
        self
    }

    /// Append more rows to an existing table.
    pub fn with_rows(mut self, table: &str, rows: Vec<Vec<SourceValue>>) -> Self {
        if let Some(t) = self.table_mut(table) {
            t.rows.extend(rows.into_iter().map(MemoryRow::Values));
        }
        self
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut MemoryTable> {
        self.tables.iter_mut().find(|t| t.schema.name == name)
    }

    fn check_schema(&self, schema: &str) -> Result<(), SourceError> {
        if schema == self.schema {
            Ok(())
        } else {
            Err(SourceError::Query(format!("schema \"{schema}\" does not exist")))
        }
    }
}

#[async_trait::async_trait]
impl TableSource for MemorySource {
    async fn foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyEdge>, SourceError> {
        self.check_schema(schema)?;
        if let Some(message) = &self.foreign_keys_error {
            return Err(SourceError::Query(message.clone()));
        }
        Ok(self.foreign_keys.clone())
    }

    async fn base_tables(&self, schema: &str) -> Result<Vec<String>, SourceError> {
        self.check_schema(schema)?;
        Ok(self.tables.iter().map(|t| t.schema.name.clone()).collect())
    }

    async fn key_column(&self, schema: &str, table: &str) -> Result<Option<String>, SourceError> {
        if schema != self.schema {
            return Ok(None);
        }
        Ok(self
            .tables
            .iter()
            .find(|t| t.schema.name == table)
            .and_then(|t| t.schema.primary_key())
            .map(String::from))
    }

    async fn scan_table(&self, schema: &str, table: &str) -> Result<TableScan, SourceError> {
        self.check_schema(schema)?;
        let t = self
            .tables
            .iter()
            .find(|t| t.schema.name == table)
            .ok_or_else(|| SourceError::TableNotFound(format!("{schema}.{table}")))?;
        if let Some(message) = &t.scan_error {
            return Err(SourceError::Connection(message.clone()));
        }

        let columns: Arc<[String]> = Arc::clone(&t.schema.columns);
        let mut items = Vec::with_capacity(t.rows.len());
        for row in &t.rows {
            match row {
                MemoryRow::Values(values) => {
                    items.push(Ok(SourceRow::new(Arc::clone(&columns), values.clone())));
                }
                MemoryRow::Unreadable { column } => items.push(Err(SourceError::UnsupportedType {
                    column: column.clone(),
                    type_name: "tsvector".to_string(),
                })),
                MemoryRow::StreamError(message) => {
                    items.push(Err(SourceError::Query(message.clone())));
                    break;
                }
            }
        }

        Ok(TableScan::new(t.schema.clone(), stream::iter(items).boxed()))
    }
}
