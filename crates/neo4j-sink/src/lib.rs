//! Neo4j graph sink for sql-graph-sync.
//!
//! Implements [`graph_sink::GraphSink`] on top of `neo4rs`.
//!
//! # Modules
//!
//! - [`connect`] - connection options and connect-with-retries
//! - [`cypher`] - identifier quoting and the MERGE statements
//! - [`forward`] - `GraphValue` → Bolt parameters
//! - [`reverse`] - Bolt values read back → `GraphValue`
//!
//! Every write is a single parameterized `MERGE`. Labels, property keys and
//! relationship types are backtick-quoted into the statement text; values are
//! always bound as parameters.

pub mod connect;
pub mod cypher;
pub mod forward;
pub mod reverse;
mod sink;

pub use connect::{connect, connect_with_retries, Neo4jOpts};
pub use sink::Neo4jSink;
