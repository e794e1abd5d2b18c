//! Vector index types.

use serde::{Deserialize, Serialize};

/// A caller-identified vector for the nearest-neighbor index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: i64,
    pub vector: Vec<f32>,
}

impl VectorEntry {
    pub fn new(id: i64, vector: Vec<f32>) -> Self {
        Self { id, vector }
    }
}

/// A search hit. `distance` is the squared Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub distance: f32,
    pub id: i64,
}
