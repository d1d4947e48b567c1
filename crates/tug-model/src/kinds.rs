//! Small enums shared by tugs and tasks.

use std::fmt;
use std::str::FromStr;

use tug_core::{CoreError, MINUTES_PER_DAY, SimTime};

/// Direction of a ship movement.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Movement {
    Inbound,
    Outbound,
    Transfer,
}

impl Movement {
    pub const ALL: [Movement; 3] = [Movement::Inbound, Movement::Outbound, Movement::Transfer];

    /// Position in per-movement parameter arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Movement::Inbound => 0,
            Movement::Outbound => 1,
            Movement::Transfer => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Movement::Inbound => "in",
            Movement::Outbound => "out",
            Movement::Transfer => "transfer",
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Movement {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "inbound" => Ok(Movement::Inbound),
            "out" | "outbound" => Ok(Movement::Outbound),
            "tr" | "transfer" => Ok(Movement::Transfer),
            other => Err(CoreError::Parse(format!("invalid movement {other:?}"))),
        }
    }
}

/// Job priority.  Scales the waiting penalty.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Priority {
    #[default]
    Normal,
    /// Temporary-need jobs: the ship is already under way.
    Urgent,
}

impl Priority {
    pub fn weight(self) -> f64 {
        match self {
            Priority::Normal => 1.0,
            Priority::Urgent => 10.0,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TugState {
    Free,
    Busy,
    /// Out of service for the whole run.
    Unavailable,
}

/// Task lifecycle.
///
/// ```text
/// UnprocessedUnassigned ──Confirm──▶ UnprocessedAssigned ──StartWork──▶ ProcessingAssigned ──EndWork──▶ Processed
///          ▲                                  │
///          └──(RequirementChange | large StartDelay)
/// any state before Processed ──Cancel──▶ Canceled
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskState {
    UnprocessedUnassigned,
    UnprocessedAssigned,
    ProcessingAssigned,
    Processed,
    Canceled,
}

impl TaskState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Processed | TaskState::Canceled)
    }

    /// Confirmed and not yet ended.
    #[inline]
    pub fn holds_tugs(self) -> bool {
        matches!(self, TaskState::UnprocessedAssigned | TaskState::ProcessingAssigned)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::UnprocessedUnassigned => "unprocessed_unassigned",
            TaskState::UnprocessedAssigned => "unprocessed_assigned",
            TaskState::ProcessingAssigned => "processing_assigned",
            TaskState::Processed => "processed",
            TaskState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── DutyShift ─────────────────────────────────────────────────────────────────

const DAY_SHIFT_START: i64 = 8 * 60;
const DAY_SHIFT_END: i64 = 20 * 60;

/// Recurring 12-hour duty window of a tug crew.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DutyShift {
    /// 08:00–20:00.
    #[default]
    Day,
    /// 20:00–08:00.
    Night,
    /// Always on duty (auxiliary fleets, tests).
    Always,
}

impl DutyShift {
    /// `true` if the shift is on duty at `t`.
    pub fn covers(self, t: SimTime) -> bool {
        let m = t.minute_of_day();
        debug_assert!((0..MINUTES_PER_DAY).contains(&m));
        let day = (DAY_SHIFT_START..DAY_SHIFT_END).contains(&m);
        match self {
            DutyShift::Day => day,
            DutyShift::Night => !day,
            DutyShift::Always => true,
        }
    }
}

impl FromStr for DutyShift {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(DutyShift::Day),
            "night" => Ok(DutyShift::Night),
            "always" | "all" => Ok(DutyShift::Always),
            other => Err(CoreError::Parse(format!("invalid duty shift {other:?}"))),
        }
    }
}
