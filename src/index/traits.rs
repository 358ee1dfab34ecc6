//! Core trait definition for the search capability.
//!
//! The query layer only ever sees an opened, read-only index through this
//! trait, so the engine behind it can be swapped without touching callers.

use crate::error::Result;
use crate::types::{DistanceMetric, Neighbor};

/// Read-only k-nearest-neighbor search over a loaded index.
///
/// Implementations must be safe to call concurrently without external
/// locking; there is no mutation path.
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` neighbors of `query`, ascending by distance.
    ///
    /// # Errors
    /// Returns `HwrError::DimensionMismatch` if `query` does not match
    /// the index dimensionality.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Return the total number of vectors in this index.
    fn vector_count(&self) -> usize;

    /// Return the dimensionality of vectors in this index.
    fn dimension(&self) -> usize;

    fn metric(&self) -> DistanceMetric;
}
