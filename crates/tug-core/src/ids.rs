//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  [`TaskId`] is signed: positive ids
//! are jobs from the schedule, negative ids are temporary-need jobs derived
//! from the job with the opposite id.

use std::fmt;

/// Generate a typed ID wrapper around an unsigned integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// A tug in the fleet (own or auxiliary).
    pub struct TugId(u32);
}

typed_id! {
    /// A pier or berth that jobs start and end at.
    pub struct PierId(u32);
}

typed_id! {
    /// A ship being moved.
    pub struct ShipId(u32);
}

typed_id! {
    /// The company operating a tug.
    pub struct CompanyId(u16);
}

typed_id! {
    /// Stable identity of a queued event.  Survives re-timing.
    pub struct EventId(u64);
}

// ── TaskId ────────────────────────────────────────────────────────────────────

/// Identity of a job.
///
/// `TaskId(n)` with `n > 0` is a scheduled job; `TaskId(-n)` is the
/// temporary-need job derived from job `n` while it was in progress.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskId(pub i32);

impl TaskId {
    /// `true` for temporary-need jobs.
    #[inline]
    pub fn is_derived(self) -> bool {
        self.0 < 0
    }

    /// The id a temporary-need job spawned from `self` receives.
    #[inline]
    pub fn derived(self) -> TaskId {
        TaskId(-self.0.abs())
    }

    /// The job a derived job belongs to.  `None` for scheduled jobs.
    #[inline]
    pub fn parent(self) -> Option<TaskId> {
        self.is_derived().then(|| TaskId(-self.0))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}
