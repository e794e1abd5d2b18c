//! Brute-force L2 index over caller-identified vectors.
//!
//! Vectors are stored contiguously in one `Vec<f32>` with a parallel ID list.
//! Search is exhaustive, which is exact and fast enough for the index sizes
//! this crate targets (tens of thousands of embeddings).

use memoria_types::error::StoreError;
use memoria_types::vector::{Neighbor, VectorEntry};
use serde::{Deserialize, Serialize};

/// Schema tag written into every snapshot.
pub const SNAPSHOT_SCHEMA: &str = "memoria.flat_l2.v1";

/// In-memory ID-mapped index with squared Euclidean distance.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    ids: Vec<i64>,
    data: Vec<f32>,
}

/// Serialized form of a [`FlatIndex`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub schema: String,
    pub dim: usize,
    pub ids: Vec<i64>,
    pub vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Empty index for `dim`-length vectors. A zero dimension is rejected.
    pub fn new(dim: usize) -> Result<Self, StoreError> {
        if dim == 0 {
            return Err(StoreError::InvalidRecord(
                "vector dimension must be positive".to_string(),
            ));
        }
        Ok(Self {
            dim,
            ids: Vec::new(),
            data: Vec::new(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn check_dim(&self, actual: usize) -> Result<(), StoreError> {
        if actual != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                actual,
            });
        }
        Ok(())
    }

    /// Append every entry. The batch is validated first, so a single bad
    /// vector leaves the index untouched. Components must be finite.
    pub fn add(&mut self, entries: &[VectorEntry]) -> Result<(), StoreError> {
        for entry in entries {
            self.check_dim(entry.vector.len())?;
            if let Some(pos) = entry.vector.iter().position(|x| !x.is_finite()) {
                return Err(StoreError::InvalidRecord(format!(
                    "vector {} has non-finite component at position {pos}",
                    entry.id
                )));
            }
        }
        self.ids.reserve(entries.len());
        self.data.reserve(entries.len() * self.dim);
        for entry in entries {
            self.ids.push(entry.id);
            self.data.extend_from_slice(&entry.vector);
        }
        Ok(())
    }

    /// Up to `k` nearest entries by ascending distance; ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError> {
        self.check_dim(query.len())?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(self.dim)
            .map(|row| squared_l2(row, query))
            .enumerate()
            .map(|(pos, distance)| (distance, pos))
            .collect();

        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, pos)| Neighbor {
                distance,
                id: self.ids[pos],
            })
            .collect())
    }

    pub fn to_snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            schema: SNAPSHOT_SCHEMA.to_string(),
            dim: self.dim,
            ids: self.ids.clone(),
            vectors: self.data.chunks_exact(self.dim).map(<[f32]>::to_vec).collect(),
        }
    }

    /// Rebuild an index from a snapshot, validating its shape.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self, StoreError> {
        if snapshot.schema != SNAPSHOT_SCHEMA {
            return Err(StoreError::Corrupt(format!(
                "unsupported index schema '{}'",
                snapshot.schema
            )));
        }
        if snapshot.dim == 0 {
            return Err(StoreError::Corrupt("index dimension is zero".to_string()));
        }
        if snapshot.ids.len() != snapshot.vectors.len() {
            return Err(StoreError::Corrupt(format!(
                "{} ids but {} vectors",
                snapshot.ids.len(),
                snapshot.vectors.len()
            )));
        }

        let mut data = Vec::with_capacity(snapshot.vectors.len() * snapshot.dim);
        for (i, vector) in snapshot.vectors.iter().enumerate() {
            if vector.len() != snapshot.dim {
                return Err(StoreError::Corrupt(format!(
                    "vector {i} has length {}, expected {}",
                    vector.len(),
                    snapshot.dim
                )));
            }
            data.extend_from_slice(vector);
        }

        Ok(Self {
            dim: snapshot.dim,
            ids: snapshot.ids,
            data,
        })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
