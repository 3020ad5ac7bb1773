//! Test infrastructure
//!
//! - [`MemorySource`] - an in-memory relational source with failure injection
//! - [`fixtures`] - canned datasets
//! - [`test_helpers`] - configuration for end-to-end tests against real services

pub mod fixtures;
pub mod memory_source;
pub mod test_helpers;

pub use memory_source::MemorySource;
pub use test_helpers::{generate_test_id, TestConfig};
