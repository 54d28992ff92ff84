//! Single seeded random source threaded through a pipeline run
//!
//! Every pass draws from the same `ChaCha20Rng`, created once at pipeline
//! entry. Identical seed + identical input + identical configuration gives
//! byte-identical output. Ranges are drawn as `u32` so the sequence does not
//! depend on pointer width.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

pub type PassRng = ChaCha20Rng;

/// Build the run's random source. `None` seeds from OS entropy.
pub fn seeded(seed: Option<u64>) -> PassRng {
    match seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::seed_from_u64(rand::random()),
    }
}

/// Bernoulli draw. Always consumes exactly one value from the stream.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    let draw: f64 = rng.gen();
    draw < probability
}

/// Uniform index in `0..len` (len must be > 0)
pub fn index<R: Rng + ?Sized>(rng: &mut R, len: usize) -> usize {
    rng.gen_range(0..len as u32) as usize
}

/// Uniform pick from a slice
pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[index(rng, items.len())])
    }
}

/// Uniform float in `[low, high)`
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high <= low {
        return low;
    }
    rng.gen_range(low..high)
}
