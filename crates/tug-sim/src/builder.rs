//! Fluent builder for constructing a [`Simulator`].

use std::collections::HashMap;

use tug_core::{SimRng, SimTime, TaskId};
use tug_dispatch::DispatchPolicy;
use tug_event::{EventKind, EventQueue};
use tug_model::{EntityPool, Task, Tug};
use tug_port::PortServices;

use crate::roster::DutyRoster;
use crate::{NoPerturbation, PerturbationModel, RunStats, SimError, SimOptions, SimResult, Simulator};

/// An event fixed in advance rather than drawn by the perturbation model.
///
/// Events naming a job are held back until that job is admitted and then
/// queued at their time, or at the admission time if that is later.
/// Task-less events may only be [`EventKind::Routine`] and are queued at
/// build time.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptedEvent {
    pub task: Option<TaskId>,
    pub time: SimTime,
    pub kind: EventKind,
}

/// Fluent builder for [`Simulator`].
///
/// # Required inputs
///
/// - [`SimOptions`] — window, seed, speed, help settings, …
/// - the scheduled jobs and the own fleet
/// - a [`DispatchPolicy`]
/// - [`PortServices`] — geography and duration model
///
/// # Optional inputs (have defaults)
///
/// | Method              | Default              |
/// |---------------------|----------------------|
/// | `.help_tugs(v)`     | No help fleet        |
/// | `.perturbation(m)`  | [`NoPerturbation`]   |
/// | `.scripted(v)`      | No scripted events   |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(options, tasks, tugs, GreedyProfit::default(), services)
///     .help_tugs(help)
///     .perturbation(StochasticPerturbation::default())
///     .build()?;
/// let result = sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    options:      SimOptions,
    tasks:        Vec<Task>,
    tugs:         Vec<Tug>,
    help:         Vec<Tug>,
    policy:       Box<dyn DispatchPolicy>,
    services:     PortServices,
    perturbation: Box<dyn PerturbationModel>,
    scripted:     Vec<ScriptedEvent>,
}

impl SimBuilder {
    /// Create a builder with all required inputs.
    pub fn new(
        options:  SimOptions,
        tasks:    Vec<Task>,
        tugs:     Vec<Tug>,
        policy:   impl DispatchPolicy + 'static,
        services: PortServices,
    ) -> Self {
        Self {
            options,
            tasks,
            tugs,
            help:         Vec::new(),
            policy:       Box::new(policy),
            services,
            perturbation: Box::new(NoPerturbation),
            scripted:     Vec::new(),
        }
    }

    /// Supply the auxiliary fleet.  Every tug is marked auxiliary.
    pub fn help_tugs(mut self, tugs: Vec<Tug>) -> Self {
        self.help = tugs.into_iter().map(Tug::auxiliary).collect();
        self
    }

    pub fn perturbation(mut self, model: impl PerturbationModel + 'static) -> Self {
        self.perturbation = Box::new(model);
        self
    }

    /// Fixed events on top of the perturbation model's draws.
    pub fn scripted(mut self, events: Vec<ScriptedEvent>) -> Self {
        self.scripted = events;
        self
    }

    /// Validate inputs, build the entity pool and event queue, and return a
    /// ready-to-run [`Simulator`].
    pub fn build(self) -> SimResult<Simulator> {
        self.options.validate()?;

        // ── Validate jobs ─────────────────────────────────────────────────
        if !self.tasks.is_empty() && self.tugs.is_empty() {
            return Err(SimError::Config("jobs given but the own fleet is empty".into()));
        }
        for task in &self.tasks {
            if task.id.0 <= 0 {
                return Err(SimError::Config(format!("{} is not a valid job id", task.id)));
            }
            if task.required.is_empty() {
                return Err(SimError::Config(format!("{} requires no tugs", task.id)));
            }
        }

        let mut backlog: Vec<(SimTime, TaskId)> =
            self.tasks.iter().map(|t| (t.scheduled_start, t.id)).collect();
        backlog.sort_unstable();

        // ── Entities ──────────────────────────────────────────────────────
        let help_ids = self.help.iter().map(|t| t.id).collect();
        let mut tugs = self.tugs;
        tugs.extend(self.help);
        let entities = EntityPool::new(tugs, self.tasks)?;

        // ── Scripted events ───────────────────────────────────────────────
        let mut queue = EventQueue::new();
        let mut scripted: HashMap<TaskId, Vec<(SimTime, EventKind)>> = HashMap::new();
        for ev in self.scripted {
            check_scripted_kind(&ev)?;
            match ev.task {
                Some(id) if entities.contains_task(id) => {
                    scripted.entry(id).or_default().push((ev.time, ev.kind));
                }
                Some(id) => {
                    return Err(SimError::Config(format!("scripted event for unknown {id}")));
                }
                None => {
                    queue.push(None, ev.time, ev.kind);
                }
            }
        }

        let mut services = self.services;
        services.tug_speed_knots = self.options.tug_speed_knots;

        Ok(Simulator {
            now:          backlog.first().map_or(SimTime::ZERO, |&(t, _)| t - self.options.window),
            rng:          SimRng::new(self.options.seed),
            roster:       DutyRoster::new(self.options.duty_floor),
            backlog:      backlog.into_iter().map(|(_, id)| id).collect(),
            visible:      Vec::new(),
            pool:         Vec::new(),
            help:         help_ids,
            deferrals:    HashMap::new(),
            stats:        RunStats::default(),
            scripted,
            options:      self.options,
            entities,
            queue,
            policy:       self.policy,
            services,
            perturbation: self.perturbation,
        })
    }
}

fn check_scripted_kind(ev: &ScriptedEvent) -> SimResult<()> {
    let ok = match (&ev.kind, ev.task) {
        (EventKind::Routine, None) => true,
        (EventKind::Routine, Some(_)) | (_, None) => false,
        (EventKind::Confirm | EventKind::StartWork | EventKind::EndWork, Some(_)) => false,
        (_, Some(_)) => true,
    };
    if ok {
        Ok(())
    } else {
        Err(SimError::Config(format!("{} cannot be scripted for {:?}", ev.kind, ev.task)))
    }
}
