//! Per-job outcomes and run totals.
//!
//! A temporary-need job is not reported on its own: its moving cost and its
//! tugs' departures are folded into the job it was derived from, which
//! already carries the extra classes in its requirement and the extra tugs
//! in its tug list.

use std::collections::BTreeMap;

use tug_core::{CapabilityClass, CompanyId, MatchGrade, Minutes, ShipId, SimTime, TaskId, TugId};
use tug_model::{EntityPool, Movement, TaskState, billing};

/// Counters kept by the event loop.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStats {
    pub events:             u64,
    pub dispatch_rounds:    u64,
    /// Calls into the policy; a round with a failed help request calls twice.
    pub policy_invocations: u64,
    pub help_failures:      u64,
    pub deferrals:          u64,
    pub stall_guards:       u64,
}

/// Class pairs of a job, required against assigned, both sorted ascending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchCounts {
    pub exact: usize,
    pub over:  usize,
    /// Includes requirements left without a tug.
    pub under: usize,
}

impl MatchCounts {
    pub fn of(required: &[CapabilityClass], assigned: &[CapabilityClass]) -> Self {
        let mut req = required.to_vec();
        let mut got = assigned.to_vec();
        req.sort_unstable();
        got.sort_unstable();
        let mut counts = Self::default();
        for (&r, &a) in req.iter().zip(&got) {
            match MatchGrade::of(r, a) {
                MatchGrade::Exact => counts.exact += 1,
                MatchGrade::Over => counts.over += 1,
                MatchGrade::Under => counts.under += 1,
            }
        }
        counts.under += req.len().saturating_sub(got.len());
        counts
    }

    pub fn total(&self) -> usize {
        self.exact + self.over + self.under
    }

    fn add(&mut self, other: MatchCounts) {
        self.exact += other.exact;
        self.over += other.over;
        self.under += other.under;
    }
}

/// Final figures of one scheduled job.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskOutcome {
    pub task:            TaskId,
    pub ship:            ShipId,
    pub movement:        Movement,
    pub state:           TaskState,
    pub scheduled_start: SimTime,
    pub realized_start:  SimTime,
    pub end:             SimTime,
    pub required:        Vec<CapabilityClass>,
    pub tugs:            Vec<(TugId, CapabilityClass)>,
    /// Company of the first assigned tug.
    pub company:         Option<CompanyId>,
    pub temporary_need:  bool,
    pub moving_cost:     f64,
    pub moving_minutes:  Minutes,
    pub waiting_minutes: Minutes,
    pub waiting_cost:    f64,
    pub revenue:         f64,
    pub profit:          f64,
    pub matches:         MatchCounts,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompanyTotals {
    pub tasks:          usize,
    pub revenue:        f64,
    pub moving_cost:    f64,
    pub moving_minutes: Minutes,
    pub profit:         f64,
}

/// Everything a run produced.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunResult {
    pub policy:          String,
    pub seed:            u64,
    /// One entry per scheduled job, by id.
    pub tasks:           Vec<TaskOutcome>,
    pub revenue:         f64,
    pub moving_cost:     f64,
    pub moving_minutes:  Minutes,
    pub waiting_cost:    f64,
    pub waiting_minutes: Minutes,
    pub profit:          f64,
    pub completed:       usize,
    pub canceled:        usize,
    pub matches:         MatchCounts,
    /// Completed jobs with at least one non-exact pair.
    pub mismatched:      usize,
    pub oversized:       usize,
    pub undersized:      usize,
    pub by_company:      BTreeMap<CompanyId, CompanyTotals>,
    pub stats:           RunStats,
}

impl RunResult {
    pub fn exact_ratio(&self) -> f64 {
        ratio(self.matches.exact, self.matches.total())
    }

    pub fn over_ratio(&self) -> f64 {
        ratio(self.matches.over, self.matches.total())
    }

    pub fn under_ratio(&self) -> f64 {
        ratio(self.matches.under, self.matches.total())
    }

    /// Mean wait of completed jobs.
    pub fn mean_waiting_minutes(&self) -> f64 {
        ratio(self.waiting_minutes as usize, self.completed)
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

/// Settle every scheduled job in `entities`, write the figures back into
/// the jobs' ledgers, and total them.
pub fn aggregate(entities: &mut EntityPool, policy: &str, seed: u64, stats: RunStats) -> RunResult {
    let mut outcomes = Vec::new();
    for task in entities.tasks().iter().filter(|t| !t.is_derived()) {
        let derived = entities.get_task(task.id.derived());

        let mut departures = task.departures.clone();
        let mut moving_cost = task.ledger.moving_cost;
        let mut moving_minutes = task.ledger.moving_minutes;
        if let Some(d) = derived {
            departures.extend_from_slice(&d.departures);
            moving_cost += d.ledger.moving_cost;
            moving_minutes += d.ledger.moving_minutes;
        }

        let tugs: Vec<(TugId, CapabilityClass)> = task
            .tugs
            .iter()
            .filter_map(|&id| entities.tug(id).ok().map(|t| (id, t.class)))
            .collect();
        let company = task
            .tugs
            .first()
            .and_then(|&id| entities.tug(id).ok())
            .map(|t| t.company);
        let classes: Vec<CapabilityClass> = tugs.iter().map(|&(_, c)| c).collect();

        let end = task.end_time();
        let (waiting_minutes, waiting_cost, revenue) = match task.state {
            TaskState::Processed => {
                let waiting = (task.realized_start - task.scheduled_start).max(0);
                let billed: Vec<(TugId, CapabilityClass, SimTime)> = tugs
                    .iter()
                    .map(|&(id, class)| {
                        let depart = departures.iter().find(|(t, _)| *t == id).map_or(end, |&(_, d)| d);
                        (id, class, depart)
                    })
                    .collect();
                (
                    waiting,
                    billing::waiting_cost(waiting, task.priority),
                    billing::revenue(&task.required, &billed, end),
                )
            }
            _ => (0, 0.0, 0.0),
        };

        outcomes.push(TaskOutcome {
            task: task.id,
            ship: task.ship.id,
            movement: task.movement,
            state: task.state,
            scheduled_start: task.scheduled_start,
            realized_start: task.realized_start,
            end,
            required: task.required.clone(),
            matches: MatchCounts::of(&task.required, &classes),
            tugs,
            company,
            temporary_need: derived.is_some(),
            moving_cost,
            moving_minutes,
            waiting_minutes,
            waiting_cost,
            revenue,
            profit: revenue - moving_cost - waiting_cost,
        });
    }
    outcomes.sort_by_key(|o| o.task);

    for o in &outcomes {
        if let Ok(task) = entities.task_mut(o.task) {
            task.ledger.waiting_minutes = o.waiting_minutes;
            task.ledger.waiting_cost = o.waiting_cost;
            task.ledger.revenue = o.revenue;
            task.ledger.profit = o.profit;
        }
    }

    let mut result = RunResult {
        policy:          policy.to_string(),
        seed,
        tasks:           Vec::new(),
        revenue:         0.0,
        moving_cost:     0.0,
        moving_minutes:  0,
        waiting_cost:    0.0,
        waiting_minutes: 0,
        profit:          0.0,
        completed:       0,
        canceled:        0,
        matches:         MatchCounts::default(),
        mismatched:      0,
        oversized:       0,
        undersized:      0,
        by_company:      BTreeMap::new(),
        stats,
    };
    for o in &outcomes {
        result.revenue += o.revenue;
        result.moving_cost += o.moving_cost;
        result.moving_minutes += o.moving_minutes;
        result.waiting_cost += o.waiting_cost;
        result.waiting_minutes += o.waiting_minutes;
        result.profit += o.profit;
        match o.state {
            TaskState::Processed => {
                result.completed += 1;
                result.matches.add(o.matches);
                result.mismatched += usize::from(o.matches.over + o.matches.under > 0);
                result.oversized += usize::from(o.matches.over > 0);
                result.undersized += usize::from(o.matches.under > 0);
            }
            TaskState::Canceled => result.canceled += 1,
            _ => {}
        }
        if let Some(company) = o.company {
            let totals = result.by_company.entry(company).or_default();
            totals.tasks += 1;
            totals.revenue += o.revenue;
            totals.moving_cost += o.moving_cost;
            totals.moving_minutes += o.moving_minutes;
            totals.profit += o.profit;
        }
    }
    result.tasks = outcomes;
    result
}
