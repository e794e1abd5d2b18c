//! Canonical JSON encoding used for fingerprints and stored payloads.
//!
//! Object keys are sorted at every nesting level, output is pretty-printed
//! with two-space indentation, and non-ASCII text is kept verbatim. Sorting is
//! done explicitly so the encoding does not depend on whether serde_json's
//! `preserve_order` feature is enabled somewhere in the dependency graph.

use memoria_types::error::CacheError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Serialize `value` into its canonical text form.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CacheError> {
    let value =
        serde_json::to_value(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
    serde_json::to_string_pretty(&sorted(value))
        .map_err(|e| CacheError::Serialization(e.to_string()))
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = Map::with_capacity(entries.len());
            for (key, value) in entries {
                out.insert(key, sorted(value));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}
