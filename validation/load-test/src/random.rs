//! Random decisions for virtual users.
//!
//! Every probabilistic choice a walk makes goes through [`RandomSource`], so a
//! test can script the exact sequence of draws.

use rand::prelude::*;

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource: Send {
    /// Next uniform value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        let i = (self.next_f64() * len as f64) as usize;
        i.min(len - 1)
    }

    /// Bernoulli trial: true with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// [`RandomSource`] backed by a [`StdRng`].
pub struct StdRandom(StdRng);

impl StdRandom {
    /// Seeded for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Use `seed` if provided, otherwise entropy.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_f64(&mut self) -> f64 {
        self.0.gen()
    }

    fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}
