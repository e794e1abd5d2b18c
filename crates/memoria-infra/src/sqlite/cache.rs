//! SQLite-backed memoization cache store.
//!
//! Implements `CacheStore` from `memoria-core` on top of a [`RelationalStore`]
//! holding the fixed cache table. First-write-wins is enforced by the
//! `UNIQUE` constraint on `hash` together with `INSERT OR IGNORE`.

use std::path::Path;

use memoria_core::cache::CacheStore;
use memoria_core::memo::MemoCache;
use memoria_types::cache::CacheRecord;
use memoria_types::config::MemoriaConfig;
use memoria_types::error::StoreError;
use memoria_types::value::{Row, SqlValue};

use super::store::RelationalStore;
use crate::crypto::hash::Sha256ContentHasher;

/// Name of the table inside every cache database.
pub const CACHE_TABLE: &str = "cache";

const CREATE_CACHE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hash TEXT UNIQUE,
    input TEXT,
    output TEXT
)";

/// Cache records in one SQLite file.
pub struct SqliteCacheStore {
    store: RelationalStore,
}

impl SqliteCacheStore {
    /// Open the cache database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = RelationalStore::open(path, CACHE_TABLE, CREATE_CACHE_TABLE_SQL).await?;
        Ok(Self { store })
    }

    /// Open `{cache_dir}/{name}.db`.
    pub async fn open_named(cache_dir: impl AsRef<Path>, name: &str) -> Result<Self, StoreError> {
        Self::open(cache_dir.as_ref().join(format!("{name}.db"))).await
    }

    /// The underlying table, for inspection and maintenance.
    pub fn relational(&self) -> &RelationalStore {
        &self.store
    }

    /// Every stored record, oldest first.
    pub async fn records(&self) -> Result<Vec<CacheRecord>, StoreError> {
        self.store
            .find_all()
            .await?
            .iter()
            .map(record_from_row)
            .collect()
    }
}

fn text_field(row: &Row, column: &str) -> Result<String, StoreError> {
    row.get(column)
        .and_then(SqlValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidRecord(format!("cache row missing text column '{column}'")))
}

fn record_from_row(row: &Row) -> Result<CacheRecord, StoreError> {
    let id = row
        .get("id")
        .and_then(SqlValue::as_i64)
        .ok_or_else(|| StoreError::InvalidRecord("cache row missing id".to_string()))?;
    Ok(CacheRecord {
        id,
        hash: text_field(row, "hash")?,
        input: text_field(row, "input")?,
        output: text_field(row, "output")?,
    })
}

impl CacheStore for SqliteCacheStore {
    async fn lookup(&self, fingerprint: &str) -> Result<Option<String>, StoreError> {
        let rows = self.store.find_by("hash", fingerprint).await?;
        match rows.first() {
            Some(row) => text_field(row, "output").map(Some),
            None => Ok(None),
        }
    }

    async fn record(&self, fingerprint: &str, input: &str, output: &str) -> Result<bool, StoreError> {
        let row = Row::new()
            .with("hash", fingerprint)
            .with("input", input)
            .with("output", output);
        let inserted = self.store.insert_if_absent(&[row]).await?;
        Ok(inserted == 1)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear().await
    }
}

/// Open the SHA-256 memo cache named `name` under the configured cache directory.
pub async fn open_memo_cache(
    config: &MemoriaConfig,
    name: &str,
) -> Result<MemoCache<SqliteCacheStore, Sha256ContentHasher>, StoreError> {
    let store = SqliteCacheStore::open(config.cache_path(name)).await?;
    Ok(MemoCache::new(store, Sha256ContentHasher::new()))
}
