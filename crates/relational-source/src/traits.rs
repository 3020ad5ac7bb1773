//! TableSource trait definition.

use crate::error::SourceError;
use futures::stream::BoxStream;
use sync_core::{ForeignKeyEdge, SourceRow, TableSchema};

/// Lazy, finite stream of rows for one table.
pub type RowStream = BoxStream<'static, Result<SourceRow, SourceError>>;

/// One table's record batch: its column layout and a lazily fetched row
/// stream.
///
/// The stream is consumed once; rows are fetched incrementally so a table
/// never needs to fit in memory. The stream owns whatever connection it reads
/// from, and dropping it releases that connection.
pub struct TableScan {
    pub schema: TableSchema,
    pub rows: RowStream,
}

impl TableScan {
    pub fn new(schema: TableSchema, rows: RowStream) -> Self {
        Self { schema, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.schema.columns
    }
}

/// Trait for reading a relational schema instance.
///
/// Implementations hold their own connection handles. All methods take
/// `&self` so one source can serve several concurrent table scans.
#[async_trait::async_trait]
pub trait TableSource: Send + Sync {
    /// Foreign-key column pairs whose parent table belongs to `schema`.
    async fn foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyEdge>, SourceError>;

    /// Names of all base tables in `schema`.
    async fn base_tables(&self, schema: &str) -> Result<Vec<String>, SourceError>;

    /// Column nodes of `schema.table` are keyed on: the first column in
    /// declaration order, matching the column order of a scan. `None` when
    /// the table does not exist or has no columns.
    async fn key_column(&self, schema: &str, table: &str) -> Result<Option<String>, SourceError>;

    /// Open a row scan over `schema.table`.
    async fn scan_table(&self, schema: &str, table: &str) -> Result<TableScan, SourceError>;
}
