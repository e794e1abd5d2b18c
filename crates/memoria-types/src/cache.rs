//! Persisted memoization records.

use serde::{Deserialize, Serialize};

/// One memoized call as stored in the cache table.
///
/// `input` and `output` are canonical JSON documents; `output` is the
/// `{"output": ...}` envelope around the operation's return value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub id: i64,
    pub hash: String,
    pub input: String,
    pub output: String,
}
