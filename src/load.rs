//! Full load: extract edges, stream every table through normalize →
//! upsert → resolve, then reconcile stubs.

use crate::error::LoadError;
use crate::normalize::normalize_row;
use crate::report::{DanglingReason, DanglingStub, LoadReport, SkipReason, TableReport};
use crate::resolve::{resolve_relationships, CreatedStub, StubRegistry};
use crate::schema::{extract_edge_set, EdgeSet, ExternalReferencePolicy};
use crate::upsert::upsert_node;
use futures::{stream, StreamExt};
use graph_sink::{GraphSink, MergeOutcome};
use relational_source::{SourceError, TableSource};
use std::collections::HashSet;
use std::time::Instant;

/// Options for a full load.
#[derive(Debug, Clone)]
pub struct LoadOpts {
    /// Source schema to migrate
    pub schema: String,
    /// Tables to load (empty means every base table of the schema)
    pub tables: Vec<String>,
    /// Maximum number of tables processed concurrently
    pub parallelism: usize,
    pub external_references: ExternalReferencePolicy,
    /// Check every stub created during the run once all tables are loaded
    pub reconcile_stubs: bool,
}

impl Default for LoadOpts {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            tables: Vec::new(),
            parallelism: 1,
            external_references: ExternalReferencePolicy::Stub,
            reconcile_stubs: true,
        }
    }
}

/// Result of one table worker.
struct TableOutcome {
    report: TableReport,
    stubs: Vec<CreatedStub>,
}

/// Materialize `opts.schema` from `source` into `sink`.
///
/// Only schema introspection and table listing are fatal. Everything else is
/// recorded in the returned report and the load carries on. Every write is
/// an idempotent merge: re-running after a failure or cancellation converges
/// to the same graph.
pub async fn run_full_load<T: TableSource, G: GraphSink>(
    source: &T,
    sink: &G,
    opts: &LoadOpts,
) -> Result<LoadReport, LoadError> {
    let started = Instant::now();
    let mut report = LoadReport::new(&opts.schema);
    tracing::info!("Starting full load of schema '{}'", opts.schema);

    let edge_set = extract_edge_set(source, &opts.schema, opts.external_references).await?;
    report.foreign_key_edges = edge_set.len();
    report.composite_constraints = edge_set.composite_constraints().map(String::from).collect();
    report.external_edges_skipped = edge_set.external_edges_skipped();

    ensure_referenced_identities(source, sink, &edge_set).await;

    let tables = select_tables(source, opts).await?;
    tracing::info!(
        "Found {} tables to load (parallelism {})",
        tables.len(),
        opts.parallelism.max(1)
    );

    let registry = StubRegistry::new();
    let outcomes: Vec<TableOutcome> = stream::iter(tables.iter())
        .map(|table| load_table(source, sink, &opts.schema, table, &edge_set, &registry))
        .buffer_unordered(opts.parallelism.max(1))
        .collect()
        .await;

    let mut stubs = Vec::new();
    let mut seen = HashSet::new();
    for outcome in outcomes {
        for stub in outcome.stubs {
            if seen.insert(stub.key.clone()) {
                stubs.push(stub);
            }
        }
        report.tables.push(outcome.report);
    }
    report.tables.sort_by(|a, b| a.table.cmp(&b.table));

    if opts.reconcile_stubs {
        let loaded: HashSet<&str> = report
            .tables
            .iter()
            .filter(|t| t.is_loaded())
            .map(|t| t.table.as_str())
            .collect();
        report.dangling_stubs = reconcile_stubs(&stubs, &registry, &loaded);
    }

    report.duration_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        "Full load of schema '{}' completed: {} nodes created, {} merged, {} relationships created",
        opts.schema,
        report.nodes_created(),
        report.nodes_merged(),
        report.relationships().created
    );
    Ok(report)
}

async fn select_tables<T: TableSource>(
    source: &T,
    opts: &LoadOpts,
) -> Result<Vec<String>, LoadError> {
    let all = source
        .base_tables(&opts.schema)
        .await
        .map_err(|source| LoadError::TableListing {
            schema: opts.schema.clone(),
            source,
        })?;

    if opts.tables.is_empty() {
        return Ok(all);
    }

    for wanted in &opts.tables {
        if !all.contains(wanted) {
            tracing::warn!(
                "Table '{wanted}' is not a base table of schema '{}', ignoring it",
                opts.schema
            );
        }
    }
    Ok(all
        .into_iter()
        .filter(|t| opts.tables.contains(t))
        .collect())
}

/// Failures are logged, never fatal.
async fn ensure_identity<G: GraphSink>(sink: &G, label: &str, key: &str) {
    if let Err(e) = sink.ensure_identity(label, key).await {
        tracing::warn!("Could not ensure identity constraint on {label}.{key}: {e}");
    }
}

/// Register identity constraints for referenced columns that are their
/// table's key column.
///
/// A foreign key may target any unique column, but rows are merged on the
/// key column. Constraining another column would make a row conflict with
/// the stub created for it, so such columns are left alone.
async fn ensure_referenced_identities<T: TableSource, G: GraphSink>(
    source: &T,
    sink: &G,
    edge_set: &EdgeSet,
) {
    for (schema, table, column) in edge_set.referenced_identities() {
        match source.key_column(&schema, &table).await {
            Ok(Some(key)) if key == column => ensure_identity(sink, &table, &column).await,
            Ok(Some(key)) => tracing::warn!(
                "Foreign keys reference {table}.{column}, not its key column '{key}'; \
                 stubs created for them stay separate from the rows"
            ),
            Ok(None) => tracing::debug!("No columns found for {schema}.{table}"),
            Err(e) => tracing::warn!("Could not read the key column of {schema}.{table}: {e}"),
        }
    }
}

async fn load_table<T: TableSource, G: GraphSink>(
    source: &T,
    sink: &G,
    schema: &str,
    table: &str,
    edge_set: &EdgeSet,
    registry: &StubRegistry,
) -> TableOutcome {
    let mut report = TableReport::new(table);
    let mut stubs = Vec::new();
    tracing::info!("Loading table: {table}");

    let mut scan = match source.scan_table(schema, table).await {
        Ok(scan) => scan,
        Err(e) => {
            let err = LoadError::DataFetch {
                table: table.to_string(),
                source: e,
            };
            tracing::warn!("{err}; skipping table");
            report.fail(&err);
            return TableOutcome { report, stubs };
        }
    };
    report.columns = scan.columns().len();

    if let Some(pk) = scan.schema.primary_key() {
        ensure_identity(sink, table, pk).await;
    }

    while let Some(item) = scan.rows.next().await {
        let row = match item {
            Ok(row) => row,
            Err(SourceError::UnsupportedType { column, type_name }) => {
                report.rows_read += 1;
                tracing::warn!(
                    "Skipping row of table '{table}': column '{column}' has unsupported type '{type_name}'"
                );
                report.rows_skipped.record(SkipReason::UnreadableRow);
                continue;
            }
            Err(e) => {
                let err = LoadError::DataFetch {
                    table: table.to_string(),
                    source: e,
                };
                tracing::warn!(
                    "{err}; stopping table after {} rows",
                    report.rows_read
                );
                report.fail(&err);
                break;
            }
        };
        report.rows_read += 1;

        let properties = normalize_row(&row);
        let node = match upsert_node(sink, &scan.schema, &properties).await {
            Ok((node, outcome)) => {
                match outcome {
                    MergeOutcome::Created => report.nodes_created += 1,
                    MergeOutcome::Matched => report.nodes_merged += 1,
                }
                registry.record_row(&node, outcome);
                node
            }
            Err(err @ LoadError::MissingPrimaryKey { .. }) => {
                tracing::warn!("{err}; skipping row");
                report.rows_skipped.record(SkipReason::MissingPrimaryKey);
                continue;
            }
            Err(err) => {
                tracing::warn!("Failed to write node for a row of table '{table}': {err}");
                report.rows_skipped.record(SkipReason::NodeWriteFailed);
                continue;
            }
        };

        let created = resolve_relationships(
            sink,
            &properties,
            table,
            &node,
            edge_set,
            registry,
            &mut report.relationships,
        )
        .await;
        report.stubs_created += created.len() as u64;
        stubs.extend(created);
    }

    tracing::info!(
        "Loaded table {table}: {} rows, {} nodes created, {} merged, {} skipped",
        report.rows_read,
        report.nodes_created,
        report.nodes_merged,
        report.rows_skipped.total()
    );
    TableOutcome { report, stubs }
}

/// Report every stub created in this run that no row merged into.
///
/// Nothing is deleted.
fn reconcile_stubs(
    stubs: &[CreatedStub],
    registry: &StubRegistry,
    loaded: &HashSet<&str>,
) -> Vec<DanglingStub> {
    let dangling: Vec<DanglingStub> = stubs
        .iter()
        .filter(|stub| !registry.is_completed(&stub.key))
        .map(|stub| {
            let key = &stub.key;
            let reason = if loaded.contains(key.label.as_str()) {
                DanglingReason::NeverCompleted
            } else {
                DanglingReason::TableNotLoaded
            };
            tracing::warn!(
                "Dangling stub node {key} (created by {}): {reason:?}",
                stub.created_by
            );
            DanglingStub {
                label: key.label.clone(),
                key: key.key.clone(),
                value: key.value.clone(),
                created_by: stub.created_by.clone(),
                reason,
            }
        })
        .collect();

    if !stubs.is_empty() {
        tracing::info!(
            "Reconciled {} stub nodes, {} dangling",
            stubs.len(),
            dangling.len()
        );
    }
    dangling
}
