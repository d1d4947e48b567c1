//! `TimelineInsertion` — slot jobs into gaps of per-tug timelines.

use tug_core::{CapabilityClass, GeoPoint, Minutes, PierId, SimTime, TugId, covers};
use tug_model::{Task, Tug};
use tug_port::PortServices;

use super::{DispatchPolicy, estimate_work};
use crate::fleet::MAX_CANDIDATES;
use crate::{DispatchPlan, DispatchRequest, DispatchResult, Proposal, combinations};

/// Keeps one timeline per tug of the jobs placed in the current round and
/// inserts each new job at the earliest start where enough tugs have a gap
/// wide enough for the travel in, the work and the travel on to the next
/// booking.
///
/// Derived jobs are placed first, then multi-tug jobs, then single-tug jobs.
/// At each candidate start a covering set is preferred; only when no start
/// admits a covering set does the policy accept any set.
#[derive(Clone, Debug)]
pub struct TimelineInsertion {
    pub max_candidates: usize,
}

impl Default for TimelineInsertion {
    fn default() -> Self {
        Self { max_candidates: MAX_CANDIDATES }
    }
}

#[derive(Clone, Debug)]
struct Booking {
    start:       SimTime,
    end:         SimTime,
    origin:      PierId,
    destination: PierId,
}

#[derive(Clone, Debug)]
struct Timeline {
    tug:        TugId,
    class:      CapabilityClass,
    horsepower: u32,
    auxiliary:  bool,
    available:  SimTime,
    position:   GeoPoint,
    /// Sorted by start.
    bookings:   Vec<Booking>,
}

impl Timeline {
    fn new(now: SimTime, tug: &Tug) -> Self {
        Self {
            tug:        tug.id,
            class:      tug.class,
            horsepower: tug.horsepower,
            auxiliary:  tug.auxiliary,
            available:  tug.next_available.max(now),
            position:   tug.position,
            bookings:   Vec::new(),
        }
    }

    /// Where and when the tug is free before a job starting at `start`.
    fn before(&self, start: SimTime, services: &PortServices) -> (usize, SimTime, GeoPoint) {
        let i = self.bookings.partition_point(|b| b.start <= start);
        match i.checked_sub(1).map(|j| &self.bookings[j]) {
            Some(prev) => (i, prev.end, services.position_of(prev.destination)),
            None => (i, self.available, self.position),
        }
    }

    /// Earliest arrival at `origin` after the base availability and after
    /// each booking.
    fn ready_points(&self, origin: PierId, floor: SimTime, services: &PortServices) -> Vec<SimTime> {
        let base = self.available.max(floor) + services.travel_time(self.position, origin);
        let after = self.bookings.iter().map(|b| {
            b.end.max(floor) + services.travel_time(services.position_of(b.destination), origin)
        });
        std::iter::once(base).chain(after).collect()
    }

    /// If the tug can serve `job` from `start` for `work` minutes, the
    /// position it leaves from.
    fn fits(
        &self,
        job:      &Task,
        start:    SimTime,
        work:     Minutes,
        floor:    SimTime,
        services: &PortServices,
    ) -> Option<GeoPoint> {
        let (i, free_at, from) = self.before(start, services);
        if free_at.max(floor) + services.travel_time(from, job.origin) > start {
            return None;
        }
        if let Some(next) = self.bookings.get(i) {
            let onward = services.travel_time(services.position_of(job.destination), next.origin);
            if start + work + onward > next.start {
                return None;
            }
        }
        Some(from)
    }

    fn insert(&mut self, booking: Booking) {
        let i = self.bookings.partition_point(|b| b.start <= booking.start);
        self.bookings.insert(i, booking);
    }
}

struct Placement {
    tugs:  Vec<TugId>,
    start: SimTime,
    work:  Minutes,
}

impl TimelineInsertion {
    fn place(
        &self,
        req:       &DispatchRequest<'_>,
        lines:     &[Timeline],
        job:       &Task,
        with_help: bool,
    ) -> DispatchResult<Option<Placement>> {
        let services = req.services;
        let floor = req.floor_for(job);
        let excluded = req.excluded_for(job);
        let k = job.required.len();

        let mut open: Vec<&Timeline> = lines
            .iter()
            .filter(|l| with_help || !l.auxiliary)
            .filter(|l| !excluded.contains(&l.tug))
            .collect();
        if k == 0 || open.len() < k {
            return Ok(None);
        }
        open.sort_by_key(|l| (l.available, l.tug));

        // One duration estimate per job, from the tugs free soonest.
        let probe: Vec<TugId> = open.iter().take(k).map(|l| l.tug).collect();
        let work = estimate_work(req, job, &probe)?;

        let mut starts: Vec<SimTime> = open
            .iter()
            .flat_map(|l| l.ready_points(job.origin, floor, services))
            .filter(|&t| t >= job.scheduled_start)
            .collect();
        starts.push(job.scheduled_start);
        starts.sort_unstable();
        starts.dedup();

        for covering_only in [true, false] {
            for &start in &starts {
                let mut feasible: Vec<(&Timeline, f64)> = open
                    .iter()
                    .filter_map(|l| {
                        let from = l.fits(job, start, work, floor, services)?;
                        let km = services.geography.distance_km(from, job.origin);
                        Some((*l, km * services.geography.fuel_cost_per_km(l.horsepower)))
                    })
                    .collect();
                if feasible.len() < k {
                    continue;
                }
                feasible.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.tug.cmp(&b.0.tug)));
                feasible.truncate(self.max_candidates);

                let mut best: Option<(Vec<TugId>, f64)> = None;
                for combo in combinations(feasible.len(), k) {
                    let classes: Vec<CapabilityClass> = combo.iter().map(|&i| feasible[i].0.class).collect();
                    if covering_only && !covers(&classes, &job.required) {
                        continue;
                    }
                    let cost: f64 = combo.iter().map(|&i| feasible[i].1).sum();
                    if best.as_ref().is_none_or(|(_, c)| cost < *c) {
                        best = Some((combo.iter().map(|&i| feasible[i].0.tug).collect(), cost));
                    }
                }
                if let Some((tugs, _)) = best {
                    return Ok(Some(Placement { tugs, start, work }));
                }
            }
        }
        Ok(None)
    }
}

/// Derived jobs, then multi-tug jobs, then single-tug jobs.
fn placement_order(job: &Task) -> (u8, SimTime, i32) {
    let group = if job.is_derived() {
        0
    } else if job.required.len() > 1 {
        1
    } else {
        2
    };
    (group, job.scheduled_start, job.id.0)
}

impl DispatchPolicy for TimelineInsertion {
    fn name(&self) -> &str {
        "timeline_insertion"
    }

    fn dispatch(&self, req: &DispatchRequest<'_>) -> DispatchResult<DispatchPlan> {
        let mut lines: Vec<Timeline> = Vec::with_capacity(req.pool.len() + req.help.len());
        for &tug in req.pool.iter().chain(&req.help) {
            if lines.iter().all(|l| l.tug != tug.id) {
                lines.push(Timeline::new(req.now, tug));
            }
        }

        let mut jobs = req.jobs.clone();
        jobs.sort_by_key(|j| placement_order(j));

        let mut plan = DispatchPlan::new();
        for job in jobs {
            let own = self.place(req, &lines, job, false)?;
            let own_wait = own.as_ref().map_or(Minutes::MAX, |p| p.start - job.scheduled_start);
            let chosen = if req.wants_help(own_wait) {
                match (own, self.place(req, &lines, job, true)?) {
                    (Some(o), Some(h)) => Some(if h.start < o.start { h } else { o }),
                    (o, h) => o.or(h),
                }
            } else {
                own
            };

            let Some(p) = chosen else {
                plan.push(Proposal::unassigned(job));
                continue;
            };
            for line in lines.iter_mut().filter(|l| p.tugs.contains(&l.tug)) {
                line.insert(Booking {
                    start:       p.start,
                    end:         p.start + p.work,
                    origin:      job.origin,
                    destination: job.destination,
                });
            }
            plan.push(Proposal { task: job.id, tugs: p.tugs, start: p.start });
        }
        Ok(plan)
    }
}
