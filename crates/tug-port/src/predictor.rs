//! Work-duration prediction.

use tug_core::{CapabilityClass, Minutes, TaskId};
use tug_model::{Movement, Task, Tug};

use crate::{Geography, PortError, PortResult};

/// What a predictor knows about a job.
#[derive(Clone, Debug, PartialEq)]
pub struct JobProfile {
    pub task:       TaskId,
    pub weight:     f64,
    pub movement:   Movement,
    pub wind_level: u8,
    /// Hour of day of the planned start.
    pub hour:       i64,
    /// Pier-to-pier distance of the movement.
    pub route_km:   f64,
}

impl JobProfile {
    pub fn of(task: &Task, geography: &dyn Geography) -> Self {
        let origin = geography.position_of(task.origin);
        Self {
            task:       task.id,
            weight:     task.ship.weight,
            movement:   task.movement,
            wind_level: task.wind_level,
            hour:       task.scheduled_start.hour(),
            route_km:   geography.distance_km(origin, task.destination),
        }
    }
}

/// What a predictor knows about one assigned tug.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TugProfile {
    pub class:      CapabilityClass,
    pub horsepower: u32,
}

impl From<&Tug> for TugProfile {
    fn from(tug: &Tug) -> Self {
        Self { class: tug.class, horsepower: tug.horsepower }
    }
}

/// Predicts how long a job takes with a given set of tugs.
///
/// # Contract
///
/// - Deterministic.
/// - Returns [`PortError::EmptyTugSet`] for an empty `tugs` slice instead of
///   a meaningless duration.
/// - Always returns at least one minute.
pub trait DurationPredictor: Send + Sync {
    fn predict(&self, job: &JobProfile, tugs: &[TugProfile]) -> PortResult<Minutes>;
}

// ── FixedPredictor ────────────────────────────────────────────────────────────

/// Every job takes the same time.  Handy for tests and what-if runs.
#[derive(Copy, Clone, Debug)]
pub struct FixedPredictor(pub Minutes);

impl DurationPredictor for FixedPredictor {
    fn predict(&self, job: &JobProfile, tugs: &[TugProfile]) -> PortResult<Minutes> {
        if tugs.is_empty() {
            return Err(PortError::EmptyTugSet { task: job.task });
        }
        Ok(self.0.max(1))
    }
}

// ── LinearPredictor ───────────────────────────────────────────────────────────

/// Additive duration model over the same features the harbour regression
/// uses: ship weight, route length, movement, wind, tug count, and average
/// engine power.
#[derive(Clone, Debug)]
pub struct LinearPredictor {
    /// Base minutes per movement, indexed by [`Movement::index`].
    pub base:               [f64; 3],
    /// Minutes per 10 000 t of ship weight.
    pub per_weight_level:   f64,
    pub per_route_km:       f64,
    /// Minutes per wind level above 3.
    pub per_wind_level:     f64,
    /// Minutes saved per tug beyond the first.
    pub per_extra_tug:      f64,
    /// Minutes saved per 1 000 hp of average engine power.
    pub per_thousand_hp:    f64,
    pub minimum:            Minutes,
}

impl Default for LinearPredictor {
    fn default() -> Self {
        Self {
            base:             [45.0, 35.0, 40.0],
            per_weight_level: 4.0,
            per_route_km:     3.0,
            per_wind_level:   3.0,
            per_extra_tug:    3.0,
            per_thousand_hp:  1.5,
            minimum:          20,
        }
    }
}

impl DurationPredictor for LinearPredictor {
    fn predict(&self, job: &JobProfile, tugs: &[TugProfile]) -> PortResult<Minutes> {
        if tugs.is_empty() {
            return Err(PortError::EmptyTugSet { task: job.task });
        }
        let weight_level = (job.weight / 10_000.0).floor().min(10.0);
        let wind_excess = job.wind_level.saturating_sub(3) as f64;
        let avg_hp = tugs.iter().map(|t| t.horsepower as f64).sum::<f64>() / tugs.len() as f64;

        let minutes = self.base[job.movement.index()]
            + self.per_weight_level * weight_level
            + self.per_route_km * job.route_km
            + self.per_wind_level * wind_excess
            - self.per_extra_tug * (tugs.len() - 1) as f64
            - self.per_thousand_hp * avg_hp / 1_000.0;

        Ok((minutes.round() as Minutes).max(self.minimum.max(1)))
    }
}
