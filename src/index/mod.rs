//! Index module for nearest-neighbor lookups.
//!
//! Provides the `VectorIndex` trait, distance functions and the on-disk
//! `FlatIndex` engine the dataset loader opens.

pub mod distance;
pub mod flat;
pub mod traits;

// Re-export the core trait and the flat engine at the module level
// so callers can write `use crate::index::{VectorIndex, FlatIndex}`.
pub use flat::FlatIndex;
pub use traits::VectorIndex;
