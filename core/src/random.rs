//! Shared pseudo-random source.

use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng, SeedableRng,
};
use rand_chacha::ChaCha8Rng;

/// Pseudo-random source shared by every system within a tick.
pub trait RandomSource {
    /// Uniform sample in `[0, 1)`.
    fn uniform01(&mut self) -> f32;

    /// Uniform integer in the inclusive range `lo..=hi`. Returns `lo` when the
    /// range is empty.
    fn uniform_int(&mut self, lo: i32, hi: i32) -> i32;

    /// Index drawn proportionally to `weights`, or `None` when no weight is
    /// positive.
    fn weighted_choice(&mut self, weights: &[f64]) -> Option<usize>;

    /// Returns `true` with the provided probability.
    fn chance(&mut self, probability: f32) -> bool {
        self.uniform01() < probability
    }

    /// Uniform index into a collection of `len` elements.
    fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let hi = i32::try_from(len - 1).unwrap_or(i32::MAX);
        usize::try_from(self.uniform_int(0, hi)).ok()
    }
}

/// Deterministic ChaCha-backed random source.
#[derive(Clone, Debug)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    /// Creates a generator that replays identically for the same seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SimRng {
    fn uniform01(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    fn uniform_int(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        self.inner.gen_range(lo..=hi)
    }

    fn weighted_choice(&mut self, weights: &[f64]) -> Option<usize> {
        let distribution = WeightedIndex::new(weights).ok()?;
        Some(distribution.sample(&mut self.inner))
    }
}
