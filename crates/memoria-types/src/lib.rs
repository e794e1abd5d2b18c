//! Shared domain types for Memoria.
//!
//! Row values, vector entries, cache records, configuration, and the error
//! enums shared by the memoization engine and its storage adapters.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod cache;
pub mod config;
pub mod error;
pub mod value;
pub mod vector;
