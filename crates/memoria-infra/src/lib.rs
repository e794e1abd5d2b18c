//! Infrastructure layer for Memoria.
//!
//! Contains implementations of the ports defined in `memoria-core`: the
//! SQLite-backed relational and cache stores, the persistent flat vector
//! index, SHA-256 fingerprint hashing, the per-location lock registry, and
//! configuration loading.

pub mod config;
pub mod crypto;
pub mod lock;
pub mod sqlite;
pub mod vector;
