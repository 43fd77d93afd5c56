//! Random number sources.
//!
//! All randomness in the engine flows through [`RandomSource`], so a test can
//! swap the seeded generator for a scripted sequence and assert exact outcomes.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;

/// A source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    /// Next uniform draw in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    /// Uniform draw in `[lo, hi)`.
    #[inline]
    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.next_f32() * (hi - lo)
    }

    /// Uniform draw in `[-1, 1)`.
    #[inline]
    fn signed(&mut self) -> f32 {
        self.next_f32() * 2.0 - 1.0
    }

    /// True with probability `p`.
    #[inline]
    fn chance(&mut self, p: f32) -> bool {
        self.next_f32() < p
    }

    /// Uniform heading in `[0, 2π)`.
    #[inline]
    fn angle(&mut self) -> f32 {
        self.next_f32() * TAU
    }
}

/// Seeded ChaCha generator used by the world.
#[derive(Clone, Debug)]
pub struct SimRng(ChaCha8Rng);

impl SimRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Seed from the thread-local generator.
    pub fn random_seed() -> u64 {
        rand::thread_rng().gen()
    }
}

impl RandomSource for SimRng {
    #[inline]
    fn next_f32(&mut self) -> f32 {
        self.0.gen::<f32>()
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
#[derive(Clone, Debug)]
pub struct ScriptedRng {
    values: Vec<f32>,
    cursor: usize,
}

impl ScriptedRng {
    pub fn new(values: Vec<f32>) -> Self {
        assert!(!values.is_empty(), "scripted sequence must not be empty");
        Self { values, cursor: 0 }
    }

    /// Always returns `value`.
    pub fn constant(value: f32) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRng {
    fn next_f32(&mut self) -> f32 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}
