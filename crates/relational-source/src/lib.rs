//! Relational source abstraction.
//!
//! This crate defines the `TableSource` trait the load engine reads through:
//! foreign-key metadata, base-table enumeration and lazy per-table row scans.
//! `postgresql-source` implements it for PostgreSQL.

mod error;
mod traits;

pub use error::SourceError;
pub use traits::{RowStream, TableScan, TableSource};
