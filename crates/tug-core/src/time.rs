//! Simulation time model.
//!
//! # Design
//!
//! Time is a signed count of whole minutes since midnight of day 0.  Every
//! timestamp in the simulator (scheduled starts, departures, availability,
//! event times) is a [`SimTime`]; every span is plain [`Minutes`].
//!
//! Using integer minutes keeps availability checks exact: the end-of-work
//! check compares `next_available` against the event time with `==`, which
//! only works because no floating-point drift can creep in.

use std::fmt;

/// A span of simulated time in whole minutes.  May be negative (e.g. a work
/// delay that finishes a job early).
pub type Minutes = i64;

pub const MINUTES_PER_HOUR: Minutes = 60;
pub const MINUTES_PER_DAY: Minutes = 24 * MINUTES_PER_HOUR;

// ── SimTime ───────────────────────────────────────────────────────────────────

/// An absolute simulation timestamp (minutes since day 0, 00:00).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(pub i64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    /// Build a timestamp from a day number and a wall-clock hour/minute.
    #[inline]
    pub fn at(day: i64, hour: i64, minute: i64) -> SimTime {
        SimTime(day * MINUTES_PER_DAY + hour * MINUTES_PER_HOUR + minute)
    }

    /// Day number (0-based).  Negative times belong to negative days.
    #[inline]
    pub fn day(self) -> i64 {
        self.0.div_euclid(MINUTES_PER_DAY)
    }

    /// Minutes elapsed since midnight of [`day`][Self::day], in `0..1440`.
    #[inline]
    pub fn minute_of_day(self) -> i64 {
        self.0.rem_euclid(MINUTES_PER_DAY)
    }

    /// Wall-clock hour in `0..24`.
    #[inline]
    pub fn hour(self) -> i64 {
        self.minute_of_day() / MINUTES_PER_HOUR
    }

    /// Minutes from `earlier` to `self` (negative if `earlier` is later).
    #[inline]
    pub fn since(self, earlier: SimTime) -> Minutes {
        self.0 - earlier.0
    }
}

impl std::ops::Add<Minutes> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs: Minutes) -> SimTime {
        SimTime(self.0 + rhs)
    }
}

impl std::ops::AddAssign<Minutes> for SimTime {
    #[inline]
    fn add_assign(&mut self, rhs: Minutes) {
        self.0 += rhs;
    }
}

impl std::ops::Sub<Minutes> for SimTime {
    type Output = SimTime;
    #[inline]
    fn sub(self, rhs: Minutes) -> SimTime {
        SimTime(self.0 - rhs)
    }
}

impl std::ops::Sub for SimTime {
    type Output = Minutes;
    #[inline]
    fn sub(self, rhs: SimTime) -> Minutes {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.minute_of_day();
        write!(f, "d{} {:02}:{:02}", self.day(), m / 60, m % 60)
    }
}
