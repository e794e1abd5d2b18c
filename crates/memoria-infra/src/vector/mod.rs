//! Persistent flat L2 vector index.

pub mod flat;
pub mod store;

pub use flat::{FlatIndex, IndexSnapshot, SNAPSHOT_SCHEMA};
pub use store::VectorIndexStore;
