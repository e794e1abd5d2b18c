//! ContentHasher trait for computing call fingerprints.
//!
//! Defined in memoria-core so the memoization engine can fingerprint canonical
//! inputs without coupling to a specific hashing algorithm. The
//! `Sha256ContentHasher` adapter lives in memoria-infra.

/// Abstraction over content hashing.
///
/// Implementations must be pure: equal input always yields the same
/// fixed-length, hex-encoded digest.
pub trait ContentHasher: Send + Sync {
    /// Compute a hex-encoded hash of the given content.
    fn compute_hash(&self, content: &str) -> String;
}
