//! `GreedyProfit` — best-margin tug set per job, jobs in schedule order.

use tug_core::{Minutes, SimTime, TugId, covers};
use tug_model::{Task, billing};

use super::{DispatchPolicy, estimate_work};
use crate::fleet::MAX_CANDIDATES;
use crate::{DispatchPlan, DispatchRequest, DispatchResult, LocalFleet, Proposal, combinations};

/// For each job, enumerate tug sets of the required size among the
/// earliest-ready candidates and keep the one with the highest
/// `revenue − moving cost − waiting penalty`.  Sets that cover the
/// requirement always beat sets that do not.
#[derive(Clone, Debug)]
pub struct GreedyProfit {
    /// Candidates considered per job, earliest-ready first.
    pub max_candidates: usize,
}

impl Default for GreedyProfit {
    fn default() -> Self {
        Self { max_candidates: MAX_CANDIDATES }
    }
}

struct Candidate {
    tugs:     Vec<TugId>,
    start:    SimTime,
    work:     Minutes,
    covering: bool,
    margin:   f64,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        match (self.covering, other.covering) {
            (true, false) => true,
            (false, true) => false,
            _ => self.margin > other.margin,
        }
    }
}

impl GreedyProfit {
    fn best(
        &self,
        req:       &DispatchRequest<'_>,
        fleet:     &LocalFleet,
        job:       &Task,
        with_help: bool,
    ) -> DispatchResult<Option<Candidate>> {
        let services = req.services;
        let floor = req.floor_for(job);
        let mut ranked = fleet.ranked(job.origin, floor, &req.excluded_for(job), with_help, services);
        ranked.truncate(self.max_candidates);

        let mut best: Option<Candidate> = None;
        for combo in combinations(ranked.len(), job.required.len()) {
            let tugs: Vec<TugId> = combo.iter().map(|&i| ranked[i].0).collect();
            let start = combo
                .iter()
                .map(|&i| ranked[i].1)
                .fold(job.scheduled_start, SimTime::max);
            let classes = fleet.classes(&tugs);
            let work = estimate_work(req, job, &tugs)?;

            let billed: Vec<_> = tugs
                .iter()
                .zip(&classes)
                .map(|(&id, &class)| {
                    let travel = fleet.travel(id, job.origin, services).unwrap_or(0);
                    (id, class, start - travel)
                })
                .collect();
            let revenue = billing::revenue(&job.required, &billed, start + work);
            let moving: f64 = tugs.iter().map(|&id| fleet.moving_cost(id, job.origin, services)).sum();
            let waiting = billing::waiting_cost(start - job.scheduled_start, job.priority);

            let candidate = Candidate {
                covering: covers(&classes, &job.required),
                margin: revenue - moving - waiting,
                tugs,
                start,
                work,
            };
            if best.as_ref().is_none_or(|b| candidate.beats(b)) {
                best = Some(candidate);
            }
        }
        Ok(best)
    }
}

impl DispatchPolicy for GreedyProfit {
    fn name(&self) -> &str {
        "greedy_profit"
    }

    fn dispatch(&self, req: &DispatchRequest<'_>) -> DispatchResult<DispatchPlan> {
        let mut fleet = LocalFleet::new(req.now, req.pool.iter().chain(&req.help).copied());
        let mut plan = DispatchPlan::new();

        for &job in &req.jobs {
            let own = self.best(req, &fleet, job, false)?;
            let own_wait = own.as_ref().map_or(Minutes::MAX, |c| c.start - job.scheduled_start);
            let chosen = if req.wants_help(own_wait) {
                match (own, self.best(req, &fleet, job, true)?) {
                    (Some(o), Some(h)) => Some(if h.beats(&o) { h } else { o }),
                    (o, h) => o.or(h),
                }
            } else {
                own
            };

            match chosen {
                Some(c) => {
                    let end_point = req.services.position_of(job.destination);
                    fleet.book(&c.tugs, end_point, c.start + c.work);
                    plan.push(Proposal { task: job.id, tugs: c.tugs, start: c.start });
                }
                None => plan.push(Proposal::unassigned(job)),
            }
        }
        Ok(plan)
    }
}
