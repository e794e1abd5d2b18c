//! File-backed vector index.
//!
//! `VectorIndexStore` wraps a [`FlatIndex`] persisted as a JSON snapshot at
//! one path. All operations take the per-location lock for that path, then
//! the in-memory index mutex.

use std::io::Write;
use std::path::{Path, PathBuf};

use memoria_types::config::MemoriaConfig;
use memoria_types::error::StoreError;
use memoria_types::value::{Row, SqlValue};
use memoria_types::vector::{Neighbor, VectorEntry};
use tokio::sync::Mutex;

use super::flat::{FlatIndex, IndexSnapshot};
use crate::lock::{location_lock, release_location_lock, LocationLock};

/// Extension of vector index files.
pub const INDEX_EXTENSION: &str = "vdb";

/// Persistent nearest-neighbor index at one file location.
///
/// A store opened without a dimension on a path with no file is *disabled*:
/// `add` is ignored and `search` returns nothing.
pub struct VectorIndexStore {
    path: PathBuf,
    configured_dim: Option<usize>,
    lock: LocationLock,
    index: Mutex<Option<FlatIndex>>,
}

fn io_err(path: &Path, err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(format!("{}: {err}", path.display()))
}

async fn load_index(path: &Path) -> Result<Option<FlatIndex>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };
    let snapshot: IndexSnapshot = serde_json::from_slice(&bytes)
        .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
    FlatIndex::from_snapshot(snapshot).map(Some)
}

/// Write `index` to `path` via a temp file in the same directory and a rename.
async fn write_index(path: &Path, index: &FlatIndex) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(&index.to_snapshot())
        .map_err(|e| StoreError::Corrupt(format!("cannot serialize index: {e}")))?;

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent)
        .await
        .map_err(|e| io_err(&parent, e))?;

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| io_err(&parent, e))?;
        tmp.write_all(&bytes).map_err(|e| io_err(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| io_err(tmp.path(), e))?;
        tmp.persist(&target).map_err(|e| io_err(&target, e))?;
        Ok::<(), StoreError>(())
    })
    .await
    .map_err(|e| StoreError::Unavailable(format!("index writer task failed: {e}")))?
}

fn entry_from_row(row: &Row) -> Result<VectorEntry, StoreError> {
    let id = row
        .get("id")
        .and_then(SqlValue::as_i64)
        .ok_or_else(|| StoreError::InvalidRecord("row has no integer 'id'".to_string()))?;
    let raw = row
        .get("embedding")
        .and_then(SqlValue::as_str)
        .ok_or_else(|| StoreError::InvalidRecord(format!("row {id} has no 'embedding' text")))?;
    let vector: Vec<f32> = serde_json::from_str(raw).map_err(|e| {
        StoreError::InvalidRecord(format!("row {id} embedding is not a numeric array: {e}"))
    })?;
    Ok(VectorEntry::new(id, vector))
}

impl VectorIndexStore {
    /// Open the index at `path`.
    ///
    /// An existing file is loaded and governs the dimension. Otherwise a new
    /// empty index of `dim` is created and persisted, or, with no `dim`, the
    /// store is disabled.
    pub async fn open(path: impl AsRef<Path>, dim: Option<usize>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let lock = location_lock(&path);
        let index = {
            let _guard = lock.lock().await;
            match load_index(&path).await? {
                Some(index) => {
                    if let Some(requested) = dim.filter(|d| *d != index.dim()) {
                        tracing::warn!(
                            path = %path.display(),
                            requested,
                            loaded = index.dim(),
                            "ignoring requested dimension for existing index"
                        );
                    }
                    tracing::info!(
                        path = %path.display(),
                        dim = index.dim(),
                        entries = index.len(),
                        "vector index loaded"
                    );
                    Some(index)
                }
                None => match dim {
                    Some(dim) => {
                        let index = FlatIndex::new(dim)?;
                        write_index(&path, &index).await?;
                        tracing::info!(path = %path.display(), dim, "vector index created");
                        Some(index)
                    }
                    None => {
                        tracing::warn!(
                            path = %path.display(),
                            "no index file and no dimension; vector store disabled"
                        );
                        None
                    }
                },
            }
        };

        Ok(Self {
            path,
            configured_dim: dim,
            lock,
            index: Mutex::new(index),
        })
    }

    /// Open `{dir}/{name}.vdb`.
    pub async fn open_named(
        dir: impl AsRef<Path>,
        name: &str,
        dim: Option<usize>,
    ) -> Result<Self, StoreError> {
        Self::open(dir.as_ref().join(format!("{name}.{INDEX_EXTENSION}")), dim).await
    }

    /// Open the index `name` under the configured index directory, using the
    /// configured default dimension.
    pub async fn from_config(config: &MemoriaConfig, name: &str) -> Result<Self, StoreError> {
        Self::open(config.index_path(name), config.default_dimension).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an index is loaded. Disabled stores ignore writes.
    pub async fn is_enabled(&self) -> bool {
        self.index.lock().await.is_some()
    }

    pub async fn len(&self) -> usize {
        self.index.lock().await.as_ref().map_or(0, FlatIndex::len)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn dim(&self) -> Option<usize> {
        self.index.lock().await.as_ref().map(FlatIndex::dim)
    }

    /// Append `entries` to the in-memory index. Call [`save`](Self::save) to
    /// persist them.
    pub async fn add(&self, entries: &[VectorEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut index = self.index.lock().await;
        match index.as_mut() {
            Some(index) => {
                index.add(entries)?;
                tracing::debug!(path = %self.path.display(), added = entries.len(), "vectors added");
            }
            None => {
                tracing::debug!(
                    path = %self.path.display(),
                    skipped = entries.len(),
                    "vector store disabled; add ignored"
                );
            }
        }
        Ok(())
    }

    /// Add rows carrying an integer `id` and a JSON-array `embedding` column.
    /// Every row is parsed before anything is added.
    pub async fn add_rows(&self, rows: &[Row]) -> Result<(), StoreError> {
        let entries = rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.add(&entries).await
    }

    /// Up to `k` nearest neighbors of `query`.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError> {
        let _guard = self.lock.lock().await;
        let index = self.index.lock().await;
        match index.as_ref() {
            Some(index) => index.search(query, k),
            None => Ok(Vec::new()),
        }
    }

    /// Persist the current index. A disabled store has nothing to write.
    pub async fn save(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let index = self.index.lock().await;
        if let Some(index) = index.as_ref() {
            write_index(&self.path, index).await?;
            tracing::debug!(path = %self.path.display(), entries = index.len(), "vector index saved");
        }
        Ok(())
    }

    /// Delete the backing file and reinitialize as `open` would: an empty
    /// index of the configured dimension, persisted immediately, or a
    /// disabled store when no dimension was configured.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut index = self.index.lock().await;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&self.path, e)),
        }

        *index = match self.configured_dim {
            Some(dim) => {
                let fresh = FlatIndex::new(dim)?;
                write_index(&self.path, &fresh).await?;
                Some(fresh)
            }
            None => None,
        };
        tracing::info!(
            path = %self.path.display(),
            enabled = index.is_some(),
            "vector index cleared"
        );
        Ok(())
    }
}

impl Drop for VectorIndexStore {
    fn drop(&mut self) {
        release_location_lock(&self.path, &self.lock);
    }
}
