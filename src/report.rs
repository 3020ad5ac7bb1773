//! Load report: per-table counters and the run summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use sync_core::GraphValue;

/// Why a row produced no node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The primary-key column is null.
    MissingPrimaryKey,
    /// A column value could not be converted.
    UnreadableRow,
    /// The graph store rejected the node write after retries.
    NodeWriteFailed,
}

/// Skipped-row counters, one per [`SkipReason`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowsSkipped {
    pub missing_primary_key: u64,
    pub unreadable_row: u64,
    pub node_write_failed: u64,
}

impl RowsSkipped {
    pub fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingPrimaryKey => self.missing_primary_key += 1,
            SkipReason::UnreadableRow => self.unreadable_row += 1,
            SkipReason::NodeWriteFailed => self.node_write_failed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.missing_primary_key + self.unreadable_row + self.node_write_failed
    }

    fn add(&mut self, other: &RowsSkipped) {
        self.missing_primary_key += other.missing_primary_key;
        self.unreadable_row += other.unreadable_row;
        self.node_write_failed += other.node_write_failed;
    }
}

/// Relationship counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationshipStats {
    /// Edges that did not exist before this run touched them.
    pub created: u64,
    /// Edges that were already present.
    pub already_present: u64,
    /// Edge instances skipped because the foreign-key value was null.
    pub skipped_null: u64,
    /// Edge instances whose lookup, stub or merge failed.
    pub failed: u64,
}

impl RelationshipStats {
    fn add(&mut self, other: &RelationshipStats) {
        self.created += other.created;
        self.already_present += other.already_present;
        self.skipped_null += other.skipped_null;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableStatus {
    /// Every row of the table was read.
    Loaded,
    /// The table could not be opened, or its stream failed part way.
    Failed { error: String },
}

/// Counters for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    #[serde(flatten)]
    pub status: TableStatus,
    /// Number of columns; 0 when the table could not be opened
    pub columns: usize,
    pub rows_read: u64,
    pub nodes_created: u64,
    /// Rows merged into a node that already existed (a stub or a previous run)
    pub nodes_merged: u64,
    pub rows_skipped: RowsSkipped,
    pub relationships: RelationshipStats,
    /// Stub nodes this table's foreign keys created
    pub stubs_created: u64,
}

impl TableReport {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            status: TableStatus::Loaded,
            columns: 0,
            rows_read: 0,
            nodes_created: 0,
            nodes_merged: 0,
            rows_skipped: RowsSkipped::default(),
            relationships: RelationshipStats::default(),
            stubs_created: 0,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.status == TableStatus::Loaded
    }

    pub fn fail(&mut self, error: impl fmt::Display) {
        self.status = TableStatus::Failed {
            error: error.to_string(),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingReason {
    /// The referenced table was not loaded in this run: it lies outside the
    /// schema, was filtered out, or failed.
    TableNotLoaded,
    /// The referenced table was loaded but none of its rows merged into the
    /// stub: the row is missing, or the foreign key targets a column other
    /// than the table's key column.
    NeverCompleted,
}

/// A stub node no real row completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DanglingStub {
    pub label: String,
    pub key: String,
    pub value: GraphValue,
    /// `table.constraint` of the foreign key that created the stub
    pub created_by: String,
    pub reason: DanglingReason,
}

/// Summary of a whole load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub schema: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub foreign_key_edges: usize,
    pub composite_constraints: Vec<String>,
    pub external_edges_skipped: usize,
    pub tables: Vec<TableReport>,
    pub dangling_stubs: Vec<DanglingStub>,
}

impl LoadReport {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            started_at: Utc::now(),
            duration_ms: 0,
            foreign_key_edges: 0,
            composite_constraints: Vec::new(),
            external_edges_skipped: 0,
            tables: Vec::new(),
            dangling_stubs: Vec::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn failed_tables(&self) -> impl Iterator<Item = &TableReport> {
        self.tables.iter().filter(|t| !t.is_loaded())
    }

    pub fn rows_read(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_read).sum()
    }

    pub fn nodes_created(&self) -> u64 {
        self.tables.iter().map(|t| t.nodes_created).sum()
    }

    pub fn nodes_merged(&self) -> u64 {
        self.tables.iter().map(|t| t.nodes_merged).sum()
    }

    pub fn stubs_created(&self) -> u64 {
        self.tables.iter().map(|t| t.stubs_created).sum()
    }

    pub fn rows_skipped(&self) -> RowsSkipped {
        let mut total = RowsSkipped::default();
        for table in &self.tables {
            total.add(&table.rows_skipped);
        }
        total
    }

    pub fn relationships(&self) -> RelationshipStats {
        let mut total = RelationshipStats::default();
        for table in &self.tables {
            total.add(&table.relationships);
        }
        total
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let skipped = self.rows_skipped();
        let rels = self.relationships();
        let failed = self.failed_tables().count();

        writeln!(
            f,
            "Schema '{}': {} tables processed ({} failed) in {}ms",
            self.schema,
            self.tables.len(),
            failed,
            self.duration_ms
        )?;
        writeln!(
            f,
            "Rows: {} read, {} nodes created, {} merged, {} skipped \
             (missing primary key: {}, unreadable: {}, write failed: {})",
            self.rows_read(),
            self.nodes_created(),
            self.nodes_merged(),
            skipped.total(),
            skipped.missing_primary_key,
            skipped.unreadable_row,
            skipped.node_write_failed
        )?;
        writeln!(
            f,
            "Relationships: {} created, {} already present, {} skipped (null key), {} failed",
            rels.created, rels.already_present, rels.skipped_null, rels.failed
        )?;
        write!(
            f,
            "Stubs: {} created, {} dangling",
            self.stubs_created(),
            self.dangling_stubs.len()
        )?;

        for table in &self.tables {
            write!(
                f,
                "\n  {}: {} rows, {} created, {} merged, {} skipped, {} relationships",
                table.table,
                table.rows_read,
                table.nodes_created,
                table.nodes_merged,
                table.rows_skipped.total(),
                table.relationships.created + table.relationships.already_present
            )?;
            if let TableStatus::Failed { error } = &table.status {
                write!(f, " [FAILED: {error}]")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_and_summary() {
        let mut report = LoadReport::new("public");
        let mut orders = TableReport::new("orders");
        orders.rows_read = 3;
        orders.nodes_created = 2;
        orders.rows_skipped.record(SkipReason::MissingPrimaryKey);
        orders.relationships.created = 1;
        orders.relationships.skipped_null = 1;
        let mut customers = TableReport::new("customers");
        customers.fail("connection reset");
        report.tables = vec![orders, customers];

        assert_eq!(report.rows_read(), 3);
        assert_eq!(report.rows_skipped().total(), 1);
        assert_eq!(report.failed_tables().count(), 1);

        let summary = report.to_string();
        assert!(summary.contains("2 tables processed (1 failed)"));
        assert!(summary.contains("missing primary key: 1"));
        assert!(summary.contains("customers: 0 rows"));
        assert!(summary.contains("[FAILED: connection reset]"));
    }

    #[test]
    fn test_json_shape() {
        let mut table = TableReport::new("orders");
        table.fail("boom");
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert_eq!(json["rows_skipped"]["missing_primary_key"], 0);
    }
}
