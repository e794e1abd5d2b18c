//! Transparent, persistent memoization of deterministic operations.
//!
//! An operation is registered with a declared [`Signature`] and wrapped by a
//! [`MemoCache`]. Each call is bound, fingerprinted, looked up in the
//! [`CacheStore`](crate::cache::CacheStore), and only executed on a miss.

pub mod canonical;
pub mod engine;
pub mod signature;

pub use engine::{CacheStats, Fingerprint, MemoCache, Memoized};
pub use signature::{BoundArguments, CallArgs, Param, Signature, SignatureBuilder, USE_CACHE_OPTION};
