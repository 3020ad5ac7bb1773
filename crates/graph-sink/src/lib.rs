//! Graph store sink abstraction.
//!
//! This crate defines the `GraphSink` trait the load engine writes through.
//! `neo4j-sink` implements it against a Neo4j server; [`MemoryGraph`] is an
//! in-process implementation used for dry runs and tests.
//!
//! The trait speaks sync-core types (`NodeKey`, `Properties`, `GraphValue`)
//! so the engine never touches a store-specific type system.

mod error;
mod memory;
mod traits;

pub use error::SinkError;
pub use memory::MemoryGraph;
pub use traits::{GraphSink, MergeOutcome};
