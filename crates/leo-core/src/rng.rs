//! Deterministic per-user RNG.
//!
//! Each user owns an independent `SmallRng` seeded by
//!
//!   seed = global_seed XOR (user_id * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive user IDs across the seed space.  Two users never
//! share RNG state, and adding users at the end of the arena leaves the
//! streams of existing users untouched.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::UserId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-user deterministic RNG.
///
/// `Clone` so that a whole simulation world can be snapshotted and replayed
/// (the oracle search does exactly that).
#[derive(Clone, Debug)]
pub struct UserRng(SmallRng);

impl UserRng {
    /// Seed deterministically from the run's global seed and a user ID.
    pub fn new(global_seed: u64, user: UserId) -> Self {
        let seed = global_seed ^ (user.0 as u64).wrapping_mul(MIXING_CONSTANT);
        UserRng(SmallRng::seed_from_u64(seed))
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// One step of a bounded random walk: `value + U(-step, step)`, floored at
    /// `min`.
    pub fn walk(&mut self, value: f64, step: f64, min: f64) -> f64 {
        if step <= 0.0 {
            return value.max(min);
        }
        (value + self.0.gen_range(-step..=step)).max(min)
    }
}
