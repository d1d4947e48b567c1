//! `PerturbationModel` — hook for stochastic deviations from the schedule.
//!
//! The scheduler consults the model at two points of a job's life:
//!
//! - **Admission** (the job enters the dispatch window): requirement
//!   changes, start delays and cancellations announced ahead of the start.
//! - **Start of work**: a work-time delay and, possibly, a temporary need
//!   for extra tugs while the job is in progress.
//!
//! Every call receives a [`TaskRng`] seeded from the run seed, the job id
//! and the decision point, so a job's perturbations do not depend on which
//! other jobs exist.  Models compose with [`PerturbationExt::then`].

use rand::distributions::{Distribution, WeightedIndex};
use tug_core::{CapabilityClass, Minutes, SimTime, TaskRng};
use tug_event::EventKind;
use tug_model::Task;

use crate::{SimError, SimResult};

// ── Trait ─────────────────────────────────────────────────────────────────────

/// # Contract
///
/// - Deterministic given the same `rng` state.
/// - No I/O, no blocking.
/// - `Send + Sync`: replications may share one model across threads.
pub trait PerturbationModel: Send + Sync {
    /// Events to raise against `task` when it is admitted.  Times earlier
    /// than the admission time are clamped to it by the scheduler.
    fn on_admit(&self, _task: &Task, _rng: &mut TaskRng) -> Vec<(SimTime, EventKind)> {
        vec![]
    }

    /// Time and size of the work delay for a job that just started.  `None`
    /// means the job ends exactly as predicted.
    fn work_delay(&self, _task: &Task, _rng: &mut TaskRng) -> Option<(SimTime, Minutes)> {
        None
    }

    /// Time and extra classes of a temporary need for a job that just
    /// started.
    fn temporary_need(
        &self,
        _task: &Task,
        _rng:  &mut TaskRng,
    ) -> Option<(SimTime, Vec<CapabilityClass>)> {
        None
    }
}

// ── No-op ─────────────────────────────────────────────────────────────────────

/// Runs the schedule exactly as planned.
pub struct NoPerturbation;

impl PerturbationModel for NoPerturbation {}

// ── Chaining ──────────────────────────────────────────────────────────────────

/// Two models in sequence: admission events are concatenated; for work
/// delays and temporary needs the first model that answers wins.
pub struct ChainedPerturbation<A: PerturbationModel, B: PerturbationModel> {
    first:  A,
    second: B,
}

impl<A: PerturbationModel, B: PerturbationModel> PerturbationModel for ChainedPerturbation<A, B> {
    fn on_admit(&self, task: &Task, rng: &mut TaskRng) -> Vec<(SimTime, EventKind)> {
        let mut events = self.first.on_admit(task, rng);
        events.extend(self.second.on_admit(task, rng));
        events
    }

    fn work_delay(&self, task: &Task, rng: &mut TaskRng) -> Option<(SimTime, Minutes)> {
        self.first
            .work_delay(task, rng)
            .or_else(|| self.second.work_delay(task, rng))
    }

    fn temporary_need(&self, task: &Task, rng: &mut TaskRng) -> Option<(SimTime, Vec<CapabilityClass>)> {
        self.first
            .temporary_need(task, rng)
            .or_else(|| self.second.temporary_need(task, rng))
    }
}

/// Adds `.then(other)` to any `PerturbationModel`.
pub trait PerturbationExt: PerturbationModel + Sized {
    fn then<B: PerturbationModel>(self, other: B) -> ChainedPerturbation<Self, B> {
        ChainedPerturbation { first: self, second: other }
    }
}

impl<M: PerturbationModel + Sized> PerturbationExt for M {}

// ── Stochastic model ──────────────────────────────────────────────────────────

/// Probabilities and ranges of [`StochasticPerturbation`].  Per-movement
/// arrays are indexed by [`Movement::index`][tug_model::Movement::index]
/// (inbound, outbound, transfer).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct PerturbationConfig {
    /// Requirement changes are announced this many minutes (inclusive range)
    /// before the scheduled start.
    pub change_lead:          (Minutes, Minutes),
    /// Replace one required class with a stronger one.
    pub upgrade_prob:         f64,
    /// Require one more tug.
    pub add_tug_prob:         f64,
    /// `add_tug_prob` at or above `windy_level`.
    pub add_tug_prob_windy:   f64,
    pub windy_level:          u8,
    pub start_delay_prob:     [f64; 3],
    pub max_start_delay:      [Minutes; 3],
    /// Start delays and cancellations are announced up to this long ahead.
    pub notice:               Minutes,
    pub cancel_prob:          [f64; 3],
    pub temp_need_prob:       [f64; 3],
    /// Sample work delays at all.  When off, StartWork is followed directly
    /// by EndWork.
    pub work_delays:          bool,
    /// Weights of the ten delay buckets per movement; bucket `k` lengthens
    /// the job by `(0.9 − 0.2·k)` of its predicted work time.
    pub work_delay_buckets:   [[f64; 10]; 3],
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            change_lead:        (10, 20),
            upgrade_prob:       0.05,
            add_tug_prob:       0.05,
            add_tug_prob_windy: 0.15,
            windy_level:        5,
            start_delay_prob:   [0.30, 0.20, 0.10],
            max_start_delay:    [60, 90, 30],
            notice:             30,
            cancel_prob:        [0.02, 0.03, 0.01],
            temp_need_prob:     [0.05, 0.03, 0.02],
            work_delays:        true,
            work_delay_buckets: [
                [0.0840, 0.4958, 0.2647, 0.1387, 0.0168, 0.0, 0.0, 0.0, 0.0, 0.0],
                [0.0, 0.0526, 0.1005, 0.2010, 0.2727, 0.1914, 0.0431, 0.0670, 0.0335, 0.0383],
                [0.2222, 0.4815, 0.1852, 0.1111, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            ],
        }
    }
}

impl PerturbationConfig {
    pub fn validate(&self) -> SimResult<()> {
        let probs = [self.upgrade_prob, self.add_tug_prob, self.add_tug_prob_windy]
            .into_iter()
            .chain(self.start_delay_prob)
            .chain(self.cancel_prob)
            .chain(self.temp_need_prob);
        for p in probs {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::Config(format!("probability {p} outside [0, 1]")));
            }
        }
        if self.change_lead.0 < 0 || self.change_lead.0 > self.change_lead.1 {
            return Err(SimError::Config("change lead must be a non-negative range".into()));
        }
        if self.notice < 0 || self.max_start_delay.iter().any(|&d| d < 1) {
            return Err(SimError::Config("notice must be non-negative and start delays positive".into()));
        }
        if self.work_delays {
            for row in &self.work_delay_buckets {
                WeightedIndex::new(row)
                    .map_err(|e| SimError::Config(format!("work delay buckets {row:?}: {e}")))?;
            }
        }
        Ok(())
    }

    /// All perturbations off.  Useful as a base for scripted what-if runs.
    pub fn quiet() -> Self {
        Self {
            upgrade_prob:       0.0,
            add_tug_prob:       0.0,
            add_tug_prob_windy: 0.0,
            start_delay_prob:   [0.0; 3],
            cancel_prob:        [0.0; 3],
            temp_need_prob:     [0.0; 3],
            work_delays:        false,
            ..Self::default()
        }
    }
}

/// The harbour's empirical disturbance model.
pub struct StochasticPerturbation {
    config: PerturbationConfig,
}

impl StochasticPerturbation {
    pub fn new(config: PerturbationConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PerturbationConfig {
        &self.config
    }

    /// A changed requirement list, or `None` if the requirement stands.
    fn changed_requirement(&self, task: &Task, rng: &mut TaskRng) -> Option<Vec<CapabilityClass>> {
        let c = &self.config;
        let required = &task.required;
        if required.iter().all(|&r| r == CapabilityClass::T130) {
            return None;
        }
        let add_prob = if task.wind_level >= c.windy_level { c.add_tug_prob_windy } else { c.add_tug_prob };

        let draw: f64 = rng.random();
        let mut changed = required.clone();
        if draw < c.upgrade_prob {
            let upgradable: Vec<usize> = (0..changed.len())
                .filter(|&i| changed[i] != CapabilityClass::T130)
                .collect();
            let &i = rng.choose(&upgradable)?;
            let stronger: Vec<CapabilityClass> =
                CapabilityClass::ALL.into_iter().filter(|&k| k > changed[i]).collect();
            changed[i] = *rng.choose(&stronger)?;
        } else if draw < c.upgrade_prob + add_prob {
            // The extra tug is never stronger than the strongest already required.
            let top = required.iter().copied().max()?;
            let weaker: Vec<CapabilityClass> = CapabilityClass::ALL.into_iter().filter(|&k| k <= top).collect();
            changed.push(*rng.choose(&weaker)?);
        } else {
            return None;
        }
        changed.sort_unstable();
        Some(changed)
    }
}

impl Default for StochasticPerturbation {
    fn default() -> Self {
        Self { config: PerturbationConfig::default() }
    }
}

impl PerturbationModel for StochasticPerturbation {
    fn on_admit(&self, task: &Task, rng: &mut TaskRng) -> Vec<(SimTime, EventKind)> {
        let c = &self.config;
        let m = task.movement.index();
        let start = task.scheduled_start;
        let mut events = Vec::new();

        if let Some(required) = self.changed_requirement(task, rng) {
            let lead = rng.gen_range(c.change_lead.0..=c.change_lead.1);
            events.push((start - lead, EventKind::RequirementChange { required }));
        }
        if rng.gen_bool(c.start_delay_prob[m]) {
            let delay = rng.gen_range(1..=c.max_start_delay[m]);
            let notice = rng.gen_range(0..=c.notice);
            events.push((start - notice, EventKind::StartDelay { delay }));
        }
        if rng.gen_bool(c.cancel_prob[m]) {
            let notice = rng.gen_range(0..=c.notice);
            events.push((start - notice, EventKind::Cancel));
        }
        events
    }

    fn work_delay(&self, task: &Task, rng: &mut TaskRng) -> Option<(SimTime, Minutes)> {
        let c = &self.config;
        if !c.work_delays || task.work_time <= 0 {
            return None;
        }
        let work = task.work_time;
        let elapsed = rng.gen_range(0..work);
        let buckets = WeightedIndex::new(&c.work_delay_buckets[task.movement.index()]).ok()?;
        let bucket = buckets.sample(rng.inner());
        let fraction = 0.9 - 0.2 * bucket as f64;
        let delay = ((fraction * work as f64).round() as Minutes).max(elapsed - work);
        Some((task.realized_start + elapsed, delay))
    }

    fn temporary_need(&self, task: &Task, rng: &mut TaskRng) -> Option<(SimTime, Vec<CapabilityClass>)> {
        if task.work_time <= 0 || !rng.gen_bool(self.config.temp_need_prob[task.movement.index()]) {
            return None;
        }
        let elapsed = rng.gen_range(1..=task.work_time);
        let class = *rng.choose(&CapabilityClass::ALL)?;
        Some((task.realized_start + elapsed, vec![class]))
    }
}
