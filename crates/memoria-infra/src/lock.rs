//! Process-wide lock registry keyed by storage location.
//!
//! Every relational and vector store acquires the lock for its backing file
//! around each physical read or write, so operations on one location are
//! totally ordered while different locations proceed in parallel. Two store
//! handles opened on the same path share one lock.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Shared handle to the lock guarding one storage location.
pub type LocationLock = Arc<Mutex<()>>;

static REGISTRY: OnceLock<DashMap<PathBuf, LocationLock>> = OnceLock::new();

fn registry() -> &'static DashMap<PathBuf, LocationLock> {
    REGISTRY.get_or_init(DashMap::new)
}

/// Registry key for `path`: made absolute against the current directory,
/// without resolving symlinks (the file may not exist yet).
fn location_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Return the lock for `path`, creating it on first use.
pub fn location_lock(path: &Path) -> LocationLock {
    registry()
        .entry(location_key(path))
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .value()
        .clone()
}

/// Drop the registry entry for `path` once `lock` is its last outside holder.
///
/// Stores call this when dropped, so the registry does not grow with every
/// location ever opened. The check and removal happen under the map's shard
/// lock, so a concurrent `location_lock` either sees the old entry or creates
/// a fresh one.
pub fn release_location_lock(path: &Path, lock: &LocationLock) {
    registry().remove_if(&location_key(path), |_, held| {
        Arc::ptr_eq(held, lock) && Arc::strong_count(held) == 2
    });
}

#[cfg(test)]
pub(crate) fn is_tracked(path: &Path) -> bool {
    registry().contains_key(&location_key(path))
}
