//! Hashing adapters.

pub mod hash;
