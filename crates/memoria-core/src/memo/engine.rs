//! The memoization engine.
//!
//! `MemoCache` couples a [`CacheStore`] with a [`ContentHasher`]. Wrapping an
//! operation yields a [`Memoized`] handle whose `call` runs the hit/miss
//! protocol:
//!
//! 1. bind call-site arguments against the declared signature
//! 2. `use_cache = false` -> run the operation directly, no store access
//! 3. fingerprint the canonical argument encoding
//! 4. hit -> decode the stored `{"output": ...}` envelope
//! 5. miss -> run the operation, store the envelope (first write wins), and
//!    return this caller's own result. An output whose envelope does not
//!    decode back is returned without being stored.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use memoria_types::error::{CacheError, MemoizeError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::canonical::canonical_json;
use super::signature::{BoundArguments, CallArgs, Signature};
use crate::cache::CacheStore;
use crate::service::hash::ContentHasher;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    output: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    output: T,
}

/// Canonical envelope text for `output`, checked to decode back into `T`.
fn encode_envelope<T: Serialize + DeserializeOwned>(output: &T) -> Result<String, CacheError> {
    let serialized = canonical_json(&EnvelopeRef { output })?;
    serde_json::from_str::<Envelope<T>>(&serialized)
        .map_err(|e| CacheError::Serialization(e.to_string()))?;
    Ok(serialized)
}

/// The canonical input text of a call and its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash: String,
    pub input: String,
}

/// Point-in-time counters of a [`MemoCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub bypasses: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    bypasses: AtomicU64,
}

/// Persistent memoization over one cache store.
///
/// One `MemoCache` serves one operation family (e.g. "chat completion",
/// "embedding"); the store is owned exclusively.
pub struct MemoCache<S, H> {
    store: S,
    hasher: H,
    counters: Counters,
}

impl<S: CacheStore, H: ContentHasher> MemoCache<S, H> {
    pub fn new(store: S, hasher: H) -> Self {
        Self {
            store,
            hasher,
            counters: Counters::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            bypasses: self.counters.bypasses.load(Ordering::Relaxed),
        }
    }

    /// Compute the fingerprint of already-bound arguments.
    pub fn fingerprint(&self, args: &BoundArguments) -> Result<Fingerprint, CacheError> {
        let input = args.canonical_json()?;
        let hash = self.hasher.compute_hash(&input);
        Ok(Fingerprint { hash, input })
    }

    /// Drop every memoized result.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store.clear().await?;
        tracing::info!("memo cache cleared");
        Ok(())
    }

    /// Wrap `operation` so calls bound against `signature` are memoized.
    pub fn wrap<F>(self, signature: Signature, operation: F) -> Memoized<S, H, F> {
        Memoized {
            cache: self,
            signature,
            operation,
        }
    }

    /// Run the hit/miss protocol for already-bound arguments.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        args: BoundArguments,
        operation: F,
    ) -> Result<T, MemoizeError<E>>
    where
        F: FnOnce(BoundArguments) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + DeserializeOwned,
    {
        if !args.cache_enabled() {
            self.counters.bypasses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("memo cache bypassed");
            return operation(args).await.map_err(MemoizeError::Operation);
        }

        let Fingerprint { hash, input } = self.fingerprint(&args)?;

        if let Some(stored) = self.store.lookup(&hash).await.map_err(CacheError::from)? {
            let envelope: Envelope<T> = serde_json::from_str(&stored)
                .map_err(|e| CacheError::Serialization(format!("stored output for {hash}: {e}")))?;
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(fingerprint = %hash, "memo cache hit");
            return Ok(envelope.output);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(fingerprint = %hash, "memo cache miss");

        let output = operation(args).await.map_err(MemoizeError::Operation)?;
        let serialized = match encode_envelope(&output) {
            Ok(serialized) => serialized,
            Err(err) => {
                tracing::warn!(
                    fingerprint = %hash,
                    error = %err,
                    "output does not round-trip through JSON; not caching"
                );
                return Ok(output);
            }
        };

        let inserted = self
            .store
            .record(&hash, &input, &serialized)
            .await
            .map_err(CacheError::from)?;
        if !inserted {
            tracing::debug!(fingerprint = %hash, "concurrent writer stored this fingerprint first");
        }

        Ok(output)
    }
}

/// A memoized operation: a [`MemoCache`], the operation's declared
/// [`Signature`], and the operation itself.
pub struct Memoized<S, H, F> {
    cache: MemoCache<S, H>,
    signature: Signature,
    operation: F,
}

impl<S: CacheStore, H: ContentHasher, F> Memoized<S, H, F> {
    pub fn cache(&self) -> &MemoCache<S, H> {
        &self.cache
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Call the operation through the cache.
    pub async fn call<T, E, Fut>(&self, args: CallArgs) -> Result<T, MemoizeError<E>>
    where
        F: Fn(BoundArguments) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + DeserializeOwned,
    {
        let bound = self.signature.bind(args)?;
        self.cache.get_or_compute(bound, &self.operation).await
    }
}
