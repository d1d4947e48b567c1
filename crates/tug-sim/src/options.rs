//! Run configuration.

use tug_core::Minutes;

use crate::{SimError, SimResult};

/// Help (auxiliary fleet) settings.  Only used when help tugs are supplied
/// to the builder.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct HelpConfig {
    /// Chance that a help request in a dispatch round goes unanswered.
    pub failure_prob: f64,
    /// Help is called only when the own fleet's best wait exceeds this.
    pub threshold:    Minutes,
}

impl Default for HelpConfig {
    fn default() -> Self {
        Self { failure_prob: 0.1, threshold: 60 }
    }
}

/// Global simulation parameters.
///
/// Every field has a default; a JSON options file only needs the fields it
/// changes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct SimOptions {
    /// Jobs become visible to dispatch this long before their scheduled start.
    pub window:                Minutes,
    /// Master RNG seed.  All per-job streams derive from it.
    pub seed:                  u64,
    /// Cruising speed; overrides the speed the port services were built with.
    pub tug_speed_knots:       f64,
    pub help:                  HelpConfig,
    /// Minimum size of the duty pool before off-duty tugs are called in.
    pub duty_floor:            usize,
    /// How far a job whose Confirm found it unstaffed is pushed back.
    pub retry_interval:        Minutes,
    /// Consecutive deferrals of one job before the run gives up.
    pub max_deferrals:         u32,
    /// An unstaffed job's Confirm further ahead than this wakes the scheduler.
    pub stall_gap:             Minutes,
    /// Where the stall guard puts its Routine event, after now.
    pub routine_offset:        Minutes,
    /// Start delays up to this keep the job's tugs.
    pub start_delay_tolerance: Minutes,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            window:                60,
            seed:                  0,
            tug_speed_knots:       8.0,
            help:                  HelpConfig::default(),
            duty_floor:            3,
            retry_interval:        10,
            max_deferrals:         288,
            stall_gap:             60,
            routine_offset:        60,
            start_delay_tolerance: 30,
        }
    }
}

impl SimOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        let fail = |msg: &str| Err(SimError::Config(msg.to_string()));
        if self.window < 0 {
            return fail("window must not be negative");
        }
        if self.tug_speed_knots.is_nan() || self.tug_speed_knots <= 0.0 {
            return fail("tug speed must be positive");
        }
        if !(0.0..=1.0).contains(&self.help.failure_prob) {
            return fail("help failure probability must lie in [0, 1]");
        }
        if self.retry_interval <= 0 {
            return fail("retry interval must be positive");
        }
        if self.routine_offset <= 0 {
            return fail("routine offset must be positive");
        }
        if self.max_deferrals == 0 {
            return fail("max deferrals must be at least 1");
        }
        Ok(())
    }
}
