//! Jobs (ship movements) and the temporary-need jobs derived from them.

use tug_core::{
    CapabilityClass, CoreResult, EventId, Minutes, PierId, ShipId, SimTime, TaskId, TugId,
    required_classes,
};

use crate::{Movement, Priority, TaskState};

/// The ship a job moves.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ship {
    pub id:     ShipId,
    /// Gross tonnage.
    pub weight: f64,
}

/// Money and time accrued by a job.
///
/// Moving figures accrue at confirmation; waiting, revenue and profit are
/// filled in when the run is aggregated.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskLedger {
    pub moving_cost:     f64,
    pub moving_minutes:  Minutes,
    pub waiting_minutes: Minutes,
    pub waiting_cost:    f64,
    pub revenue:         f64,
    pub profit:          f64,
}

/// A job in the schedule, or a temporary-need job derived from one.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Task {
    pub id:              TaskId,
    pub ship:            Ship,
    pub movement:        Movement,
    pub origin:          PierId,
    pub destination:     PierId,
    /// Wind level 1–7 at the planned start.
    pub wind_level:      u8,
    pub priority:        Priority,
    pub required:        Vec<CapabilityClass>,
    /// Tug count the job was booked with.
    pub planned_tugs:    usize,
    pub state:           TaskState,
    pub scheduled_start: SimTime,
    /// Never earlier than `scheduled_start`.
    pub realized_start:  SimTime,
    /// Predicted work duration, updated by delays.
    pub work_time:       Minutes,
    /// Assigned tugs.  Tentative until the job is confirmed.
    pub tugs:            Vec<TugId>,
    /// Departure time of each confirmed tug.
    pub departures:      Vec<(TugId, SimTime)>,
    pub ledger:          TaskLedger,
    /// Extension of the work window caused by waiting for a temporary-need
    /// job's tugs.
    pub extra_wait:      Minutes,
    pub temp_need_at:    Option<SimTime>,
    /// Every event raised against the job, in creation order.
    pub events:          Vec<EventId>,
    pub confirm_event:   Option<EventId>,
    pub start_event:     Option<EventId>,
    pub end_event:       Option<EventId>,
}

impl Task {
    /// Build a scheduled job; the required classes follow from the ship's
    /// weight and the booked tug count.
    pub fn new(
        id:          TaskId,
        ship:        Ship,
        movement:    Movement,
        origin:      PierId,
        destination: PierId,
        start:       SimTime,
        tug_count:   usize,
    ) -> CoreResult<Self> {
        let required = required_classes(ship.weight, tug_count)?;
        Ok(Self {
            id,
            ship,
            movement,
            origin,
            destination,
            wind_level: 1,
            priority: Priority::Normal,
            planned_tugs: required.len(),
            required,
            state: TaskState::UnprocessedUnassigned,
            scheduled_start: start,
            realized_start: start,
            work_time: 0,
            tugs: Vec::new(),
            departures: Vec::new(),
            ledger: TaskLedger::default(),
            extra_wait: 0,
            temp_need_at: None,
            events: Vec::new(),
            confirm_event: None,
            start_event: None,
            end_event: None,
        })
    }

    /// Override the weight-derived requirement.
    pub fn with_required(mut self, required: Vec<CapabilityClass>) -> Self {
        self.planned_tugs = required.len();
        self.required = required;
        self
    }

    pub fn with_wind_level(mut self, level: u8) -> Self {
        self.wind_level = level.clamp(1, 7);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// The temporary-need job for `extra` classes announced at `at` while
    /// `parent` is in progress.
    pub fn derived_from(parent: &Task, extra: Vec<CapabilityClass>, at: SimTime) -> Self {
        Self {
            id:              parent.id.derived(),
            ship:            parent.ship,
            movement:        parent.movement,
            origin:          parent.origin,
            destination:     parent.destination,
            wind_level:      parent.wind_level,
            priority:        Priority::Urgent,
            planned_tugs:    extra.len(),
            required:        extra,
            state:           TaskState::UnprocessedUnassigned,
            scheduled_start: at,
            realized_start:  at,
            work_time:       0,
            tugs:            Vec::new(),
            departures:      Vec::new(),
            ledger:          TaskLedger::default(),
            extra_wait:      0,
            temp_need_at:    None,
            events:          Vec::new(),
            confirm_event:   None,
            start_event:     None,
            end_event:       None,
        }
    }

    #[inline]
    pub fn is_derived(&self) -> bool {
        self.id.is_derived()
    }

    /// Order in which the scheduler stages derived jobs: announcement time,
    /// then id.
    #[inline]
    pub fn staging_key(&self) -> (SimTime, TaskId) {
        (self.scheduled_start, self.id)
    }

    /// End of the work window.
    #[inline]
    pub fn end_time(&self) -> SimTime {
        self.realized_start + self.work_time
    }

    /// End of the work window without the temporary-need extension.
    #[inline]
    pub fn base_end_time(&self) -> SimTime {
        self.end_time() - self.extra_wait
    }

    /// Departure of `tug`, if confirmed.
    pub fn departure_of(&self, tug: TugId) -> Option<SimTime> {
        self.departures.iter().find(|(t, _)| *t == tug).map(|(_, d)| *d)
    }
}
