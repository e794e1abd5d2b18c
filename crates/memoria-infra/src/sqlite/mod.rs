//! SQLite storage layer.
//!
//! `RelationalStore` is a schema-bound wrapper over one table in one database
//! file; `SqliteCacheStore` builds the memoization cache table on top of it.

pub mod cache;
pub mod store;
mod value;

pub use cache::{open_memo_cache, SqliteCacheStore};
pub use store::RelationalStore;
