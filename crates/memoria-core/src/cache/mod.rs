//! Cache storage port.
//!
//! Defines the persistence interface the memoization engine needs.
//! The SQLite implementation lives in memoria-infra.

pub mod store;

pub use store::CacheStore;
