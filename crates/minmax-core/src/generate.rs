//! Deterministic array generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate `size` integers from `seed`.
///
/// The same `(seed, size)` always yields the same array, and a longer array
/// starts with the elements of a shorter one generated from the same seed.
pub fn generate_array(seed: u32, size: usize) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(u64::from(seed));
    (0..size).map(|_| rng.r#gen::<i32>()).collect()
}
