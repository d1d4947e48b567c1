//! Deterministic per-job and simulation-level RNG wrappers.
//!
//! # Determinism strategy
//!
//! Every stochastic decision about a job draws from its own `SmallRng`
//! seeded by:
//!
//!   seed = global_seed XOR (task_id * MIXING_CONSTANT) XOR (stream * STREAM_SALT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive ids uniformly across the seed space.  The
//! stream number separates the independent decisions made for one job
//! (admission-time perturbations, work delay, temporary need) so that the
//! outcome is a pure function of (job, seed, stream): adding jobs or
//! reordering the event loop never shifts another job's draws.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::TaskId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Odd constant separating per-job streams.
const STREAM_SALT: u64 = 0xbf58_476d_1ce4_e5b9;

// ── TaskRng ───────────────────────────────────────────────────────────────────

/// Per-job deterministic RNG for one decision stream.
pub struct TaskRng(SmallRng);

impl TaskRng {
    /// Seed deterministically from the run's global seed, a job id and a
    /// stream number.
    pub fn new(global_seed: u64, task: TaskId, stream: u64) -> Self {
        let seed = global_seed
            ^ (task.0 as i64 as u64).wrapping_mul(MIXING_CONSTANT)
            ^ stream.wrapping_mul(STREAM_SALT);
        TaskRng(SmallRng::seed_from_u64(seed))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Sample a uniformly distributed value of any `Standard`-distributed type.
    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
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

    /// Choose a random element from a slice.
    /// Returns `None` if the slice is empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }
}

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Simulation-level RNG for decisions that belong to the scheduler rather
/// than to one job (help-pool failures).
///
/// Used only from the single-threaded event loop.  Independent replications
/// each build their own simulator and therefore their own `SimRng`.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed ^ MIXING_CONSTANT))
    }

    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }

    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }
}
