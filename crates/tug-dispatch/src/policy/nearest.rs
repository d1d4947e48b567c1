//! `NearestCapability` — fill each requirement with the closest tug of the
//! right class.

use tug_core::{CapabilityClass, Minutes, SimTime, TugId};
use tug_model::{Task, billing};

use super::{DispatchPolicy, estimate_work};
use crate::{DispatchPlan, DispatchRequest, DispatchResult, LocalFleet, Proposal};

/// Requirement-by-requirement matching, strongest requirement first.
///
/// For one requirement the policy looks for a tug of exactly that class
/// that can arrive within `allowance` minutes of the scheduled start and
/// picks the one with the lowest waiting penalty plus fuel cost.  Failing
/// that it tries the next class up, then widens the allowance by
/// `widen_step` until `max_allowance`.  As a last resort it takes the
/// earliest-ready unused tug of any class.
#[derive(Clone, Debug)]
pub struct NearestCapability {
    pub allowance:     Minutes,
    pub widen_step:    Minutes,
    pub max_allowance: Minutes,
}

impl Default for NearestCapability {
    fn default() -> Self {
        Self { allowance: 40, widen_step: 20, max_allowance: 300 }
    }
}

impl NearestCapability {
    fn pick(
        &self,
        req:    &DispatchRequest<'_>,
        fleet:  &LocalFleet,
        job:    &Task,
        ranked: &[(TugId, SimTime)],
        chosen: &[TugId],
        need:   CapabilityClass,
    ) -> Option<TugId> {
        let open = || ranked.iter().filter(|(id, _)| !chosen.contains(id));
        let mut allowance = self.allowance;
        loop {
            let mut class = Some(need);
            while let Some(c) = class {
                let best = open()
                    .filter(|(id, _)| fleet.get(*id).is_some_and(|s| s.class == c))
                    .filter(|(_, ready)| *ready - job.scheduled_start <= allowance)
                    .map(|&(id, ready)| {
                        let cost = billing::waiting_cost(ready - job.scheduled_start, job.priority)
                            + fleet.moving_cost(id, job.origin, req.services);
                        (id, cost)
                    })
                    .min_by(|a, b| a.1.total_cmp(&b.1));
                if let Some((id, _)) = best {
                    return Some(id);
                }
                class = c.next_up();
            }
            if allowance >= self.max_allowance {
                break;
            }
            allowance = (allowance + self.widen_step).min(self.max_allowance);
        }
        open().next().map(|&(id, _)| id)
    }

    fn staff(
        &self,
        req:       &DispatchRequest<'_>,
        fleet:     &LocalFleet,
        job:       &Task,
        with_help: bool,
    ) -> Option<(Vec<TugId>, SimTime)> {
        let floor = req.floor_for(job);
        let ranked = fleet.ranked(job.origin, floor, &req.excluded_for(job), with_help, req.services);

        let mut needs = job.required.clone();
        needs.sort_unstable_by(|a, b| b.cmp(a));

        let mut chosen = Vec::with_capacity(needs.len());
        for need in needs {
            chosen.push(self.pick(req, fleet, job, &ranked, &chosen, need)?);
        }
        let start = ranked
            .iter()
            .filter(|(id, _)| chosen.contains(id))
            .map(|&(_, ready)| ready)
            .fold(job.scheduled_start, SimTime::max);
        Some((chosen, start))
    }
}

impl DispatchPolicy for NearestCapability {
    fn name(&self) -> &str {
        "nearest_capability"
    }

    fn dispatch(&self, req: &DispatchRequest<'_>) -> DispatchResult<DispatchPlan> {
        let mut fleet = LocalFleet::new(req.now, req.pool.iter().chain(&req.help).copied());
        let mut plan = DispatchPlan::new();

        for &job in &req.jobs {
            let own = self.staff(req, &fleet, job, false);
            let own_wait = own.as_ref().map_or(Minutes::MAX, |(_, s)| *s - job.scheduled_start);
            let chosen = if req.wants_help(own_wait) {
                match (own, self.staff(req, &fleet, job, true)) {
                    (Some(o), Some(h)) => Some(if h.1 < o.1 { h } else { o }),
                    (o, h) => o.or(h),
                }
            } else {
                own
            };

            match chosen {
                Some((tugs, start)) => {
                    let work = estimate_work(req, job, &tugs)?;
                    fleet.book(&tugs, req.services.position_of(job.destination), start + work);
                    plan.push(Proposal { task: job.id, tugs, start });
                }
                None => plan.push(Proposal::unassigned(job)),
            }
        }
        Ok(plan)
    }
}
