//! `PortServices` — the service bundle handed to the scheduler and policies.

use tug_core::{GeoPoint, Minutes, PierId};
use tug_model::{Task, Tug};

use crate::{DurationPredictor, Geography, JobProfile, PortResult, TugProfile};

/// Default tug cruising speed in knots.
pub const DEFAULT_TUG_SPEED_KNOTS: f64 = 8.0;

/// Geography, duration model, and cruising speed for one run.
///
/// Constructed once at startup and passed by reference; nothing in the
/// simulator reaches for a process-wide instance.
pub struct PortServices {
    pub geography: Box<dyn Geography>,
    pub predictor: Box<dyn DurationPredictor>,
    pub tug_speed_knots: f64,
}

impl PortServices {
    pub fn new(geography: impl Geography + 'static, predictor: impl DurationPredictor + 'static) -> Self {
        Self {
            geography: Box::new(geography),
            predictor: Box::new(predictor),
            tug_speed_knots: DEFAULT_TUG_SPEED_KNOTS,
        }
    }

    pub fn with_tug_speed(mut self, knots: f64) -> Self {
        self.tug_speed_knots = knots;
        self
    }

    #[inline]
    pub fn position_of(&self, pier: PierId) -> GeoPoint {
        self.geography.position_of(pier)
    }

    #[inline]
    pub fn distance_km(&self, from: GeoPoint, to: PierId) -> f64 {
        self.geography.distance_km(from, to)
    }

    /// Sailing time from `from` to `to` at the configured speed.
    #[inline]
    pub fn travel_time(&self, from: GeoPoint, to: PierId) -> Minutes {
        self.geography.travel_time(from, to, self.tug_speed_knots)
    }

    /// Fuel cost of sailing `tug` from `from` to `to`.
    pub fn moving_cost(&self, tug: &Tug, from: GeoPoint, to: PierId) -> f64 {
        self.distance_km(from, to) * self.geography.fuel_cost_per_km(tug.horsepower)
    }

    /// Predicted work time of `task` served by `tugs`.
    pub fn predict_work(&self, task: &Task, tugs: &[&Tug]) -> PortResult<Minutes> {
        let profile = JobProfile::of(task, self.geography.as_ref());
        let tugs: Vec<TugProfile> = tugs.iter().map(|t| TugProfile::from(*t)).collect();
        self.predictor.predict(&profile, &tugs)
    }
}
