//! Full loads against the in-memory source and graph.

use graph_sink::MemoryGraph;
use sql_graph_sync::report::{DanglingReason, TableStatus};
use sql_graph_sync::testing::{fixtures, MemorySource};
use sql_graph_sync::{run_full_load, ExternalReferencePolicy, LoadError, LoadOpts};
use sync_core::{ForeignKeyEdge, GraphValue, NodeKey, SourceValue, RELATED_TO};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("sql_graph_sync=debug")
        .try_init()
        .ok();
}

fn customer(id: i64) -> NodeKey {
    NodeKey::new("customers", "id", GraphValue::Int(id))
}

fn order(id: i64) -> NodeKey {
    NodeKey::new("orders", "id", GraphValue::Int(id))
}

#[tokio::test]
async fn test_forward_reference_is_completed_by_later_row() {
    init_logging();
    let source = fixtures::customers_orders();
    let graph = MemoryGraph::new();

    let report = run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    // 3 orders + customers 7 and 8, each customer created first as a stub
    assert_eq!(graph.label_count("orders"), 3);
    assert_eq!(graph.label_count("customers"), 2);
    assert_eq!(graph.relationship_count(), 2);
    assert!(graph.has_relationship(&customer(7), &order(1), RELATED_TO));
    assert!(graph.has_relationship(&customer(8), &order(3), RELATED_TO));

    let alice = graph.node(&customer(7)).unwrap();
    assert_eq!(alice.properties.get("name"), Some(&GraphValue::from("Alice")));

    let customers = report.table("customers").unwrap();
    assert_eq!(customers.nodes_created, 0);
    assert_eq!(customers.nodes_merged, 2);
    let orders = report.table("orders").unwrap();
    assert_eq!(orders.stubs_created, 2);
    assert_eq!(orders.relationships.created, 2);
    assert_eq!(orders.relationships.skipped_null, 1);
    assert!(report.dangling_stubs.is_empty());
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    init_logging();
    let source = fixtures::customers_orders();
    let graph = MemoryGraph::new();

    run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();
    let nodes = graph.node_count();
    let relationships = graph.relationship_count();

    let report = run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    assert_eq!(graph.node_count(), nodes);
    assert_eq!(graph.relationship_count(), relationships);
    assert_eq!(report.nodes_created(), 0);
    assert_eq!(report.nodes_merged(), 5);
    assert_eq!(report.relationships().created, 0);
    assert_eq!(report.relationships().already_present, 2);
    assert_eq!(report.stubs_created(), 0);
}

#[tokio::test]
async fn test_null_foreign_key_leaves_node_unlinked() {
    let source = fixtures::customers_orders();
    let graph = MemoryGraph::new();

    run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    let lonely = graph.node(&order(2)).unwrap();
    assert!(!lonely.properties.keys().any(|k| k == "customer_id"));
    assert_eq!(lonely.properties.get("total"), Some(&GraphValue::Float(5.0)));
    assert_eq!(graph.incoming_count(&order(2)), 0);
}

#[tokio::test]
async fn test_missing_primary_key_skips_only_that_row() {
    init_logging();
    let source = MemorySource::new().with_table(
        "customers",
        &["id", "name"],
        vec![
            vec![SourceValue::Int(1), SourceValue::from("Alice")],
            vec![SourceValue::Null, SourceValue::from("Nobody")],
            vec![SourceValue::Int(2), SourceValue::from("Bob")],
        ],
    );
    let graph = MemoryGraph::new();

    let report = run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    assert_eq!(graph.label_count("customers"), 2);
    let customers = report.table("customers").unwrap();
    assert_eq!(customers.rows_read, 3);
    assert_eq!(customers.rows_skipped.missing_primary_key, 1);
    assert!(customers.is_loaded());
}

#[tokio::test]
async fn test_unique_node_per_identity_with_parallel_tables() {
    init_logging();
    // Three tables all referencing the same customers, processed at once.
    let mut source = MemorySource::new().with_table(
        "customers",
        &["id", "name"],
        (1..=20)
            .map(|i| vec![SourceValue::Int(i), SourceValue::from(format!("c{i}"))])
            .collect(),
    );
    for child in ["orders", "invoices", "tickets"] {
        source = source
            .with_table(
                child,
                &["id", "customer_id"],
                (1..=40)
                    .map(|i| vec![SourceValue::Int(i), SourceValue::Int(i % 20 + 1)])
                    .collect(),
            )
            .with_reference(
                &format!("{child}_customer_fk"),
                (child, "customer_id"),
                ("customers", "id"),
            );
    }

    let graph = MemoryGraph::new();
    let opts = LoadOpts {
        parallelism: 4,
        ..LoadOpts::default()
    };
    let report = run_full_load(&source, &graph, &opts).await.unwrap();

    assert_eq!(graph.label_count("customers"), 20);
    assert_eq!(graph.node_count(), 20 + 3 * 40);
    assert_eq!(graph.relationship_count(), 3 * 40);
    assert_eq!(report.relationships().created, 120);
    assert!(report.dangling_stubs.is_empty());
    for i in 1..=20 {
        let node = graph.node(&customer(i)).unwrap();
        assert_eq!(node.properties.get("name"), Some(&GraphValue::from(format!("c{i}"))));
    }
}

#[tokio::test]
async fn test_identity_constraints_are_requested() {
    let source = fixtures::customers_orders();
    let graph = MemoryGraph::new();

    run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    assert_eq!(
        graph.identities(),
        vec![
            ("customers".to_string(), "id".to_string()),
            ("orders".to_string(), "id".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_external_reference_stub_is_reported_dangling() {
    init_logging();
    let source = MemorySource::new()
        .with_table(
            "orders",
            &["id", "invoice_id"],
            vec![vec![SourceValue::Int(1), SourceValue::Int(900)]],
        )
        .with_foreign_key(ForeignKeyEdge::new(
            "billing",
            "orders_invoice_fk",
            ("orders", "invoice_id"),
            ("invoices", "id"),
        ));

    let graph = MemoryGraph::new();
    let report = run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    let invoice = NodeKey::new("invoices", "id", GraphValue::Int(900));
    assert!(graph.has_relationship(&invoice, &order(1), RELATED_TO));
    assert_eq!(report.dangling_stubs.len(), 1);
    let dangling = &report.dangling_stubs[0];
    assert_eq!(dangling.label, "invoices");
    assert_eq!(dangling.value, GraphValue::Int(900));
    assert_eq!(dangling.created_by, "orders.orders_invoice_fk");
    assert_eq!(dangling.reason, DanglingReason::TableNotLoaded);

    // Skipping external references drops the edge and the stub.
    let graph = MemoryGraph::new();
    let opts = LoadOpts {
        external_references: ExternalReferencePolicy::Skip,
        ..LoadOpts::default()
    };
    let report = run_full_load(&source, &graph, &opts).await.unwrap();
    assert_eq!(graph.node_count(), 1);
    assert_eq!(report.external_edges_skipped, 1);
    assert!(report.dangling_stubs.is_empty());
}

#[tokio::test]
async fn test_reference_to_missing_row_is_reported_dangling() {
    let source = fixtures::customers_orders().with_rows(
        "orders",
        vec![vec![
            SourceValue::Int(4),
            SourceValue::Int(99),
            SourceValue::Null,
        ]],
    );
    let graph = MemoryGraph::new();

    let report = run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    assert_eq!(report.dangling_stubs.len(), 1);
    assert_eq!(report.dangling_stubs[0].value, GraphValue::Int(99));
    assert_eq!(report.dangling_stubs[0].reason, DanglingReason::NeverCompleted);

    let opts = LoadOpts {
        reconcile_stubs: false,
        ..LoadOpts::default()
    };
    let report = run_full_load(&source, &MemoryGraph::new(), &opts)
        .await
        .unwrap();
    assert!(report.dangling_stubs.is_empty());
}

#[tokio::test]
async fn test_stub_completed_by_row_without_other_values() {
    let source = MemorySource::new()
        .with_table(
            "orders",
            &["id", "customer_id"],
            vec![vec![SourceValue::Int(1), SourceValue::Int(7)]],
        )
        .with_table(
            "customers",
            &["id", "name"],
            vec![vec![SourceValue::Int(7), SourceValue::Null]],
        )
        .with_reference("orders_customer_fk", ("orders", "customer_id"), ("customers", "id"));
    let graph = MemoryGraph::new();

    let report = run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    assert_eq!(report.table("customers").unwrap().nodes_merged, 1);
    assert!(report.dangling_stubs.is_empty());
}

#[tokio::test]
async fn test_reference_to_non_key_unique_column_keeps_the_row() {
    init_logging();
    // orders.product_code references products.code, a unique column that
    // is not the key column of products.
    let source = MemorySource::new()
        .with_table(
            "orders",
            &["id", "product_code"],
            vec![vec![SourceValue::Int(1), SourceValue::from("X")]],
        )
        .with_table(
            "products",
            &["id", "code", "name"],
            vec![vec![
                SourceValue::Int(5),
                SourceValue::from("X"),
                SourceValue::from("Widget"),
            ]],
        )
        .with_reference("orders_product_fk", ("orders", "product_code"), ("products", "code"));
    let graph = MemoryGraph::new();

    let report = run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    assert!(!graph
        .identities()
        .contains(&("products".to_string(), "code".to_string())));
    let products = report.table("products").unwrap();
    assert_eq!(products.nodes_created, 1);
    assert_eq!(products.rows_skipped.total(), 0);

    let product = graph
        .node(&NodeKey::new("products", "id", GraphValue::Int(5)))
        .unwrap();
    assert_eq!(product.properties.get("name"), Some(&GraphValue::from("Widget")));

    // The stub keyed on code stays a node of its own and is reported.
    assert_eq!(graph.label_count("products"), 2);
    assert_eq!(report.dangling_stubs.len(), 1);
    assert_eq!(report.dangling_stubs[0].key, "code");
    assert_eq!(report.dangling_stubs[0].reason, DanglingReason::NeverCompleted);
}

#[tokio::test]
async fn test_failed_table_does_not_stop_the_load() {
    init_logging();
    let source = fixtures::customers_orders().with_failing_scan("customers", "connection refused");
    let graph = MemoryGraph::new();

    let report = run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    assert_eq!(graph.label_count("orders"), 3);
    let customers = report.table("customers").unwrap();
    assert!(matches!(customers.status, TableStatus::Failed { .. }));
    assert_eq!(report.failed_tables().count(), 1);
    // Both customer stubs stay incomplete.
    assert_eq!(report.dangling_stubs.len(), 2);
    assert!(report
        .dangling_stubs
        .iter()
        .all(|d| d.reason == DanglingReason::TableNotLoaded));
}

#[tokio::test]
async fn test_stream_error_keeps_rows_already_written() {
    let source = MemorySource::new()
        .with_table(
            "customers",
            &["id", "name"],
            vec![vec![SourceValue::Int(1), SourceValue::from("Alice")]],
        )
        .with_unreadable_row("customers", "search_vector")
        .with_stream_error("customers", "connection reset by peer")
        .with_rows(
            "customers",
            vec![vec![SourceValue::Int(2), SourceValue::from("Bob")]],
        );
    let graph = MemoryGraph::new();

    let report = run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap();

    assert_eq!(graph.label_count("customers"), 1);
    let customers = report.table("customers").unwrap();
    assert_eq!(customers.rows_read, 2);
    assert_eq!(customers.rows_skipped.unreadable_row, 1);
    assert!(!customers.is_loaded());
}

#[tokio::test]
async fn test_schema_introspection_failure_is_fatal() {
    let source = fixtures::customers_orders().with_failing_foreign_keys("permission denied");
    let graph = MemoryGraph::new();

    let err = run_full_load(&source, &graph, &LoadOpts::default())
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::SchemaIntrospection { .. }));
    assert_eq!(graph.node_count(), 0);
}

#[tokio::test]
async fn test_unknown_schema_fails() {
    let source = fixtures::customers_orders();
    let opts = LoadOpts {
        schema: "nope".to_string(),
        ..LoadOpts::default()
    };

    let err = run_full_load(&source, &MemoryGraph::new(), &opts)
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::SchemaIntrospection { .. }));
}

#[tokio::test]
async fn test_table_filter() {
    let source = fixtures::customers_orders();
    let graph = MemoryGraph::new();
    let opts = LoadOpts {
        tables: vec!["customers".to_string(), "missing".to_string()],
        ..LoadOpts::default()
    };

    let report = run_full_load(&source, &graph, &opts).await.unwrap();

    assert_eq!(report.tables.len(), 1);
    assert_eq!(graph.label_count("orders"), 0);
    assert_eq!(graph.label_count("customers"), 2);
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let source = fixtures::customers_orders();
    let report = run_full_load(&source, &MemoryGraph::new(), &LoadOpts::default())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    std::fs::write(&path, serde_json::to_string_pretty(&report).unwrap()).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["schema"], "public");
    assert_eq!(json["tables"].as_array().unwrap().len(), 2);
    assert_eq!(json["tables"][1]["table"], "orders");
    assert_eq!(json["tables"][1]["relationships"]["created"], 2);
}
