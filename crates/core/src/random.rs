//! Injectable randomness for queue building and export anonymization.
//!
//! Everything that shuffles takes a [`RandomSource`] so tests can swap in a
//! seeded or scripted generator and assert exact orders.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniform random indices.
pub trait RandomSource: Send {
    /// Return an index uniformly distributed in `0..upper`. `upper` is never 0.
    fn index_below(&mut self, upper: usize) -> usize;
}

/// Thread-local OS-seeded generator, for production use.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index_below(&mut self, upper: usize) -> usize {
        rand::rng().random_range(0..upper)
    }
}

/// Deterministic generator seeded from a `u64`.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index_below(&mut self, upper: usize) -> usize {
        self.rng.random_range(0..upper)
    }
}

/// Unbiased in-place Fisher–Yates shuffle.
pub fn shuffle<T>(items: &mut [T], random: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = random.index_below(i + 1);
        items.swap(i, j);
    }
}
