use clap::Parser;
use sql_graph_sync::neo4j::Neo4jOpts;
use sql_graph_sync::{ExternalReferencePolicy, LoadArgs, LoadOpts, Neo4jArgs, SourceOpts};

#[test]
fn test_source_opts_parsing() {
    let opts = SourceOpts::try_parse_from([
        "test",
        "--connection-string",
        "host=localhost user=postgres",
        "--schema",
        "sales",
        "--tables",
        "customers,orders",
    ])
    .unwrap();

    assert_eq!(opts.connection_string, "host=localhost user=postgres");
    assert_eq!(opts.schema, "sales");
    assert_eq!(opts.tables, vec!["customers", "orders"]);
}

#[test]
fn test_neo4j_args_conversion() {
    let args = Neo4jArgs {
        neo4j_uri: "bolt://graph:7687".to_string(),
        neo4j_username: "neo4j".to_string(),
        neo4j_password: "secret".to_string(),
        neo4j_database: "migration".to_string(),
    };

    let opts = Neo4jOpts::from(&args);
    assert_eq!(opts.uri, "bolt://graph:7687");
    assert_eq!(opts.password, "secret");
    assert_eq!(opts.database, "migration");
}

#[test]
fn test_load_args_defaults() {
    let args = LoadArgs::try_parse_from(["test"]).unwrap();
    assert_eq!(args.parallelism, 1);
    assert_eq!(args.external_references, ExternalReferencePolicy::Stub);
    assert!(!args.no_reconcile_stubs);
    assert!(!args.dry_run);
    assert!(args.report_file.is_none());
}

#[test]
fn test_load_opts_from_args() {
    let source = SourceOpts {
        connection_string: "host=localhost".to_string(),
        schema: "public".to_string(),
        tables: vec!["orders".to_string()],
    };
    let args = LoadArgs::try_parse_from([
        "test",
        "--parallelism",
        "4",
        "--external-references",
        "skip",
        "--no-reconcile-stubs",
    ])
    .unwrap();

    let opts = LoadOpts::from_args(&source, &args);
    assert_eq!(opts.schema, "public");
    assert_eq!(opts.tables, vec!["orders"]);
    assert_eq!(opts.parallelism, 4);
    assert_eq!(opts.external_references, ExternalReferencePolicy::Skip);
    assert!(!opts.reconcile_stubs);
}

#[test]
fn test_zero_parallelism_is_rejected() {
    assert!(LoadArgs::try_parse_from(["test", "--parallelism", "0"]).is_err());
}
