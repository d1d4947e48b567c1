//! Event records.

use std::fmt;

use tug_core::{CapabilityClass, EventId, Minutes, SimTime, TaskId};

/// What happens.  One payload shape per kind.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// Commit the tentatively assigned tugs.
    Confirm,
    /// Replace the required class list.
    RequirementChange { required: Vec<CapabilityClass> },
    Cancel,
    /// The ship will be ready later than scheduled.
    StartDelay { delay: Minutes },
    /// Work runs longer (or shorter, if negative) than predicted.
    WorkDelay { delay: Minutes },
    /// Extra tugs are needed while work is in progress.
    TemporaryNeed { extra: Vec<CapabilityClass> },
    StartWork,
    EndWork,
    /// Wake the scheduler; no job attached.
    Routine,
}

impl EventKind {
    /// Precedence among events at the same minute; lower runs first.
    ///
    /// Level 8 is left free between `TemporaryNeed` and `Routine`.
    pub fn priority(&self) -> u8 {
        match self {
            EventKind::EndWork => 0,
            EventKind::WorkDelay { .. } => 1,
            EventKind::Cancel => 2,
            EventKind::StartDelay { .. } => 3,
            EventKind::RequirementChange { .. } => 4,
            EventKind::Confirm => 5,
            EventKind::StartWork => 6,
            EventKind::TemporaryNeed { .. } => 7,
            EventKind::Routine => 9,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Confirm => "confirm",
            EventKind::RequirementChange { .. } => "requirement_change",
            EventKind::Cancel => "cancel",
            EventKind::StartDelay { .. } => "start_delay",
            EventKind::WorkDelay { .. } => "work_delay",
            EventKind::TemporaryNeed { .. } => "temporary_need",
            EventKind::StartWork => "start_work",
            EventKind::EndWork => "end_work",
            EventKind::Routine => "routine",
        }
    }

    /// Kinds after which the scheduler always re-runs the dispatch policy.
    pub fn triggers_dispatch(&self) -> bool {
        matches!(
            self,
            EventKind::Routine
                | EventKind::WorkDelay { .. }
                | EventKind::StartDelay { .. }
                | EventKind::RequirementChange { .. }
                | EventKind::TemporaryNeed { .. }
                | EventKind::Cancel
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A queued event.  Immutable apart from its time, which the queue may
/// change when a job is re-dispatched.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    pub id:   EventId,
    /// `None` only for [`EventKind::Routine`].
    pub task: Option<TaskId>,
    pub time: SimTime,
    pub kind: EventKind,
}
