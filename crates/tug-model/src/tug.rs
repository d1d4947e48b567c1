//! Tugs and their service history.

use tug_core::{CapabilityClass, CompanyId, GeoPoint, SimTime, TaskId, TugId};

use crate::{DutyShift, InvariantViolation, TugState};

/// One assignment in a tug's history: when it left for the job, when work
/// started, and when the tug was released.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stint {
    pub task:       TaskId,
    /// Where the tug was before it left for the job.
    pub from:       GeoPoint,
    pub depart:     SimTime,
    pub work_start: SimTime,
    /// `None` while the assignment is open.
    pub work_end:   Option<SimTime>,
}

/// A tug in the fleet.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tug {
    pub id:             TugId,
    pub class:          CapabilityClass,
    /// Engine power; selects the fuel cost per kilometre.
    pub horsepower:     u32,
    pub company:        CompanyId,
    pub shift:          DutyShift,
    /// Member of the auxiliary (help) fleet rather than the own fleet.
    pub auxiliary:      bool,
    /// Initial berth; where a released tug returns if it has no prior job.
    pub home:           GeoPoint,
    pub position:       GeoPoint,
    pub state:          TugState,
    pub next_available: SimTime,
    pub history:        Vec<Stint>,
    /// Jobs served, in confirmation order.
    pub tasks:          Vec<TaskId>,
}

impl Tug {
    pub fn new(id: TugId, class: CapabilityClass, horsepower: u32, home: GeoPoint) -> Self {
        Self {
            id,
            class,
            horsepower,
            company: CompanyId(0),
            shift: DutyShift::Always,
            auxiliary: false,
            home,
            position: home,
            state: TugState::Free,
            next_available: SimTime::ZERO,
            history: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn with_company(mut self, company: CompanyId) -> Self {
        self.company = company;
        self
    }

    pub fn with_shift(mut self, shift: DutyShift) -> Self {
        self.shift = shift;
        self
    }

    /// Mark as a member of the auxiliary fleet.
    pub fn auxiliary(mut self) -> Self {
        self.auxiliary = true;
        self
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.state == TugState::Free
    }

    /// The stint still open for `task`, if any.
    pub fn open_stint_mut(&mut self, task: TaskId) -> Option<&mut Stint> {
        self.history
            .last_mut()
            .filter(|s| s.task == task && s.work_end.is_none())
    }

    /// Commit the tug to `task`: open a stint, move it to the job's end
    /// point, and block it until `until`.
    pub fn engage(
        &mut self,
        task:       TaskId,
        depart:     SimTime,
        work_start: SimTime,
        until:      SimTime,
        end_point:  GeoPoint,
    ) {
        self.history.push(Stint {
            task,
            from: self.position,
            depart,
            work_start,
            work_end: None,
        });
        self.tasks.push(task);
        self.position = end_point;
        self.next_available = until;
        self.state = TugState::Busy;
    }

    /// Undo the most recent [`engage`][Self::engage] for `task`: drop the
    /// stint, put the tug back where it was, and free it from `at`.
    pub fn disengage(&mut self, task: TaskId, at: SimTime) -> Result<(), InvariantViolation> {
        if self.open_stint_mut(task).is_none() {
            return Err(InvariantViolation::NoOpenStint { task, tug: self.id });
        }
        if let Some(stint) = self.history.pop() {
            self.position = stint.from;
        }
        if self.tasks.last() == Some(&task) {
            self.tasks.pop();
        }
        self.state = TugState::Free;
        self.next_available = at;
        Ok(())
    }

    /// Close the open stint for `task` at `at` and free the tug there.
    pub fn release(&mut self, task: TaskId, at: SimTime) -> Result<(), InvariantViolation> {
        let id = self.id;
        let stint = self
            .open_stint_mut(task)
            .ok_or(InvariantViolation::NoOpenStint { task, tug: id })?;
        stint.work_end = Some(at);
        self.state = TugState::Free;
        Ok(())
    }
}
