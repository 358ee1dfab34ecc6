use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate `n` random vectors of dimension `dims` with uniform f32 values in [-1, 1].
pub fn random_vectors(n: usize, dims: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|_| (0..dims).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

/// Labels `glyph_0 .. glyph_{n-1}`.
pub fn glyph_labels(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("glyph_{i}")).collect()
}
