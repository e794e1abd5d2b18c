//! Fingerprint-keyed cache store trait.

use memoria_types::error::StoreError;

/// Persistent `fingerprint -> output` storage with first-write-wins semantics.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in memoria-infra.
pub trait CacheStore: Send + Sync {
    /// Return the serialized output stored for `fingerprint`, if any.
    fn lookup(
        &self,
        fingerprint: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Store a result unless `fingerprint` is already present.
    ///
    /// Returns `true` when a new record was written, `false` when an existing
    /// record for the same fingerprint was kept. The uniqueness check must be
    /// enforced by the storage engine, not by a prior lookup.
    fn record(
        &self,
        fingerprint: &str,
        input: &str,
        output: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Remove every record.
    fn clear(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
