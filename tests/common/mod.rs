/*
 * Shared fixtures for the integration tests.
 */

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Size of the large randomized round-trip fixture.
pub const LARGE_LEN: usize = 1_000_000;

/// A million pseudo-random bytes from a fixed seed, for deterministic,
/// reproducible round-trip coverage across both model orders.
pub fn large_random_bytes(seed: u64) -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..LARGE_LEN).map(|_| rng.gen()).collect()
}
