//! Core data model for sql-graph-sync.
//!
//! This crate provides the types shared by relational sources, graph sinks
//! and the load engine:
//!
//! - [`SourceValue`] / [`SourceRow`] - raw values and rows read from a table
//! - [`GraphValue`] / [`Properties`] - portable node property values
//! - [`TableSchema`] - ordered column layout of a table
//! - [`ForeignKeyEdge`] - a single-column foreign-key constraint
//! - [`NodeKey`] / [`Node`] - graph node identity and node snapshots
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── relational-source   (TableSource trait, yields SourceRow)
//!    │      └─── postgresql-source
//!    │
//!    ├─── graph-sink          (GraphSink trait, consumes NodeKey/Properties)
//!    │      └─── neo4j-sink
//!    │
//!    └─── sql-graph-sync      (normalizer, upsert engine, relationship resolver)
//! ```

pub mod node;
pub mod row;
pub mod schema;
pub mod values;

pub use node::{Node, NodeKey, RELATED_TO};
pub use row::{Properties, SourceRow};
pub use schema::{ForeignKeyEdge, TableSchema};
pub use values::{GraphValue, SourceValue};
