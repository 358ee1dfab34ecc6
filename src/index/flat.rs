//! Flat (exact scan) index engine.
//!
//! On-disk layout inside the index directory:
//! - `meta.json`: dimension, vector count and metric
//! - `vectors.bin`: bincode-encoded `Vec<f32>`, row-major, `count * dimension` values
//!
//! The index is opened read-only and fully resident; nothing keeps file
//! handles into the directory after `open` returns.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{HwrError, Result};
use crate::index::distance::compute_distance;
use crate::index::traits::VectorIndex;
use crate::types::{DistanceMetric, Neighbor};

pub const META_FILE: &str = "meta.json";
pub const VECTORS_FILE: &str = "vectors.bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub dimension: usize,
    pub count: usize,
    #[serde(default)]
    pub metric: DistanceMetric,
}

#[derive(Debug)]
pub struct FlatIndex {
    meta: IndexMeta,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Open an index directory read-only.
    #[instrument(skip(dir), fields(dir = %dir.display()))]
    pub fn open(dir: &Path) -> Result<Self> {
        let meta_bytes = std::fs::read(dir.join(META_FILE))?;
        let meta: IndexMeta = serde_json::from_slice(&meta_bytes)?;
        if meta.dimension == 0 {
            return Err(HwrError::Index("index dimension must be > 0".into()));
        }

        let vector_bytes = std::fs::read(dir.join(VECTORS_FILE))?;
        let vectors: Vec<f32> = bincode::deserialize(&vector_bytes)?;
        let expected = meta.count.checked_mul(meta.dimension).ok_or_else(|| {
            HwrError::Index(format!(
                "index too large: {} x {}",
                meta.count, meta.dimension
            ))
        })?;
        if vectors.len() != expected {
            return Err(HwrError::Index(format!(
                "vector data holds {} values, expected {} ({} x {})",
                vectors.len(),
                expected,
                meta.count,
                meta.dimension
            )));
        }

        debug!(
            count = meta.count,
            dimension = meta.dimension,
            metric = %meta.metric,
            "index opened"
        );
        Ok(Self { meta, vectors })
    }

    /// Persist `vectors` in the layout `open` reads. All rows must share one
    /// non-zero dimension.
    pub fn write(dir: &Path, metric: DistanceMetric, vectors: &[Vec<f32>]) -> Result<IndexMeta> {
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(HwrError::Index("cannot write an index without dimensions".into()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(HwrError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let meta = IndexMeta {
            dimension,
            count: vectors.len(),
            metric,
        };
        let flat: Vec<f32> = vectors.iter().flatten().copied().collect();

        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(META_FILE), serde_json::to_vec_pretty(&meta)?)?;
        std::fs::write(dir.join(VECTORS_FILE), bincode::serialize(&flat)?)?;
        Ok(meta)
    }

    pub fn meta(&self) -> IndexMeta {
        self.meta
    }

    fn row(&self, id: usize) -> &[f32] {
        let start = id * self.meta.dimension;
        &self.vectors[start..start + self.meta.dimension]
    }
}

fn by_distance_then_id(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.id.cmp(&b.id))
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.meta.dimension {
            return Err(HwrError::DimensionMismatch {
                expected: self.meta.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.meta.count == 0 {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<Neighbor> = (0..self.meta.count)
            .map(|id| Neighbor {
                id,
                distance: compute_distance(query, self.row(id), self.meta.metric),
            })
            .collect();

        if k < candidates.len() {
            candidates.select_nth_unstable_by(k - 1, by_distance_then_id);
            candidates.truncate(k);
        }
        candidates.sort_by(by_distance_then_id);
        Ok(candidates)
    }

    fn vector_count(&self) -> usize {
        self.meta.count
    }

    fn dimension(&self) -> usize {
        self.meta.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.meta.metric
    }
}
