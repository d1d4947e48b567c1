//! Unit and scenario tests for tug-sim.

use std::sync::{Arc, Mutex};

use tug_core::{CapabilityClass, GeoPoint, PierId, ShipId, SimTime, TaskId, TugId};
use tug_dispatch::{
    DispatchPlan, DispatchPolicy, DispatchRequest, DispatchResult, GreedyProfit, NearestCapability,
    TimelineInsertion,
};
use tug_event::{Event, EventKind, Outcome};
use tug_model::{EntityPool, Movement, Ship, Task, TaskState, Tug};
use tug_port::{FixedPredictor, PierMap, PortServices};

use crate::{
    NoopObserver, RunResult, ScriptedEvent, SimBuilder, SimError, SimObserver, SimOptions,
    Simulator, StochasticPerturbation,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const PIER_A: GeoPoint = GeoPoint { lat: 22.60, lon: 120.28 };
const PIER_B: GeoPoint = GeoPoint { lat: 22.56, lon: 120.31 };

fn services() -> PortServices {
    PortServices::new(
        PierMap::new([(PierId(0), PIER_A), (PierId(1), PIER_B)], PIER_A),
        FixedPredictor(60),
    )
}

/// Minutes from pier 1 to pier 0 at the default speed.
fn crossing() -> i64 {
    services().travel_time(PIER_B, PierId(0))
}

/// A job from pier 0 to pier 1; 3 000 t ships need 117s.
fn job(id: i32, tugs: usize, start: i64) -> Task {
    Task::new(
        TaskId(id),
        Ship { id: ShipId(id as u32), weight: 3_000.0 },
        Movement::Inbound,
        PierId(0),
        PierId(1),
        SimTime(start),
        tugs,
    )
    .unwrap()
}

fn tug(id: u32, at: GeoPoint) -> Tug {
    Tug::new(TugId(id), CapabilityClass::T117, 2_400, at)
}

fn scripted(task: i32, time: i64, kind: EventKind) -> ScriptedEvent {
    ScriptedEvent { task: Some(TaskId(task)), time: SimTime(time), kind }
}

fn sim(tasks: Vec<Task>, tugs: Vec<Tug>, policy: impl DispatchPolicy + 'static) -> SimBuilder {
    SimBuilder::new(SimOptions::default(), tasks, tugs, policy, services())
}

fn task(sim: &Simulator, id: i32) -> &Task {
    sim.entities().task(TaskId(id)).unwrap()
}

/// Records what the loop reports.
#[derive(Default)]
struct Recorder {
    events:     Vec<(SimTime, Option<TaskId>, &'static str, Outcome)>,
    dispatches: Vec<SimTime>,
    deferrals:  Vec<(TaskId, u32)>,
    ended:      bool,
}

impl Recorder {
    fn kinds_at(&self, t: i64) -> Vec<&'static str> {
        self.events.iter().filter(|e| e.0 == SimTime(t)).map(|e| e.2).collect()
    }
}

impl SimObserver for Recorder {
    fn on_dispatch(&mut self, now: SimTime, _plan: &DispatchPlan, _help_failed: bool) {
        self.dispatches.push(now);
    }

    fn on_event(&mut self, event: &Event, outcome: Outcome, _entities: &EntityPool) {
        self.events.push((event.time, event.task, event.kind.name(), outcome));
    }

    fn on_deferral(&mut self, _now: SimTime, task: TaskId, attempt: u32) {
        self.deferrals.push((task, attempt));
    }

    fn on_sim_end(&mut self, _result: &RunResult) {
        self.ended = true;
    }
}

/// Wraps a policy and logs, per call, whether help was offered and how
/// many help tugs came with it.
struct Recording<P> {
    inner: P,
    calls: Arc<Mutex<Vec<(bool, usize)>>>,
}

impl<P: DispatchPolicy> DispatchPolicy for Recording<P> {
    fn name(&self) -> &str {
        "recording"
    }

    fn dispatch(&self, req: &DispatchRequest<'_>) -> DispatchResult<DispatchPlan> {
        self.calls.lock().unwrap().push((req.allow_help, req.help.len()));
        self.inner.dispatch(req)
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use super::*;

    #[test]
    fn rejects_bad_options() {
        let mut options = SimOptions::default();
        options.window = -1;
        let r = SimBuilder::new(options, vec![job(1, 1, 100)], vec![tug(0, PIER_A)], GreedyProfit::default(), services())
            .build();
        assert!(matches!(r, Err(SimError::Config(_))));
    }

    #[test]
    fn rejects_jobs_without_fleet() {
        let r = sim(vec![job(1, 1, 100)], vec![], GreedyProfit::default()).build();
        assert!(matches!(r, Err(SimError::Config(_))));
    }

    #[test]
    fn rejects_non_positive_job_ids() {
        let r = sim(vec![job(0, 1, 100)], vec![tug(0, PIER_A)], GreedyProfit::default()).build();
        assert!(matches!(r, Err(SimError::Config(_))));
    }

    #[test]
    fn rejects_duplicate_tugs() {
        let r = sim(vec![job(1, 1, 100)], vec![tug(0, PIER_A), tug(0, PIER_B)], GreedyProfit::default()).build();
        assert!(matches!(r, Err(SimError::Model(_))));
    }

    #[test]
    fn rejects_unscriptable_events() {
        let confirm = sim(vec![job(1, 1, 100)], vec![tug(0, PIER_A)], GreedyProfit::default())
            .scripted(vec![scripted(1, 90, EventKind::Confirm)])
            .build();
        assert!(matches!(confirm, Err(SimError::Config(_))));

        let unknown = sim(vec![job(1, 1, 100)], vec![tug(0, PIER_A)], GreedyProfit::default())
            .scripted(vec![scripted(7, 90, EventKind::Cancel)])
            .build();
        assert!(matches!(unknown, Err(SimError::Config(_))));
    }

    #[test]
    fn speed_option_reaches_the_services() {
        let mut options = SimOptions::default();
        options.tug_speed_knots = 12.0;
        let s = SimBuilder::new(options, vec![], vec![], GreedyProfit::default(), services())
            .build()
            .unwrap();
        assert_eq!(s.services.tug_speed_knots, 12.0);
    }

    #[test]
    fn help_tugs_become_auxiliary() {
        let s = sim(vec![job(1, 1, 100)], vec![tug(0, PIER_A)], GreedyProfit::default())
            .help_tugs(vec![tug(10, PIER_A)])
            .build()
            .unwrap();
        assert!(s.entities().tug(TugId(10)).unwrap().auxiliary);
        assert!(!s.entities().tug(TugId(0)).unwrap().auxiliary);
    }
}

// ── Duty roster ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod roster {
    use super::*;
    use crate::DutyRoster;
    use tug_model::{DutyShift, TugState};

    #[test]
    fn off_shift_tugs_fill_a_thin_pool() {
        let mut tugs: Vec<Tug> = (0..5).map(|i| tug(i, PIER_A).with_shift(DutyShift::Day)).collect();
        tugs.push(tug(5, PIER_A).with_shift(DutyShift::Night));
        tugs.push(tug(6, PIER_A).auxiliary());
        let mut entities = EntityPool::new(tugs, vec![]).unwrap();

        // 02:00 on day 0: only the night tug is on shift.
        let now = SimTime::at(0, 2, 0);
        let mut roster = DutyRoster::new(3);
        let pool = roster.refresh(&mut entities, now).unwrap();
        assert_eq!(pool, vec![TugId(5), TugId(0), TugId(1), TugId(2)]);
        assert_eq!(entities.tug(TugId(0)).unwrap().next_available, now);
        assert_eq!(entities.tug(TugId(4)).unwrap().next_available, SimTime::ZERO);
    }

    #[test]
    fn busy_and_on_shift_tugs_stay() {
        let mut tugs: Vec<Tug> = (0..4).map(|i| tug(i, PIER_A).with_shift(DutyShift::Day)).collect();
        tugs[3].shift = DutyShift::Night;
        tugs[3].state = TugState::Busy;
        tugs[2].state = TugState::Unavailable;
        let mut entities = EntityPool::new(tugs, vec![]).unwrap();

        let mut roster = DutyRoster::new(1);
        let pool = roster.refresh(&mut entities, SimTime::at(0, 10, 0)).unwrap();
        assert_eq!(pool, vec![TugId(0), TugId(1), TugId(3)]);
        assert_eq!(roster.current(), pool.as_slice());
    }

    #[test]
    fn returning_tugs_keep_their_availability() {
        let mut entities = EntityPool::new(vec![tug(0, PIER_A)], vec![]).unwrap();
        let mut roster = DutyRoster::new(1);
        roster.refresh(&mut entities, SimTime(10)).unwrap();
        entities.tug_mut(TugId(0)).unwrap().next_available = SimTime(5);
        roster.refresh(&mut entities, SimTime(20)).unwrap();
        assert_eq!(entities.tug(TugId(0)).unwrap().next_available, SimTime(5));
    }
}

// ── Perturbation model ────────────────────────────────────────────────────────

#[cfg(test)]
mod perturbation {
    use super::*;
    use crate::{NoPerturbation, PerturbationConfig, PerturbationExt, PerturbationModel};
    use tug_core::TaskRng;

    fn started(id: i32) -> Task {
        let mut t = job(id, 1, 600);
        t.work_time = 60;
        t.state = TaskState::ProcessingAssigned;
        t
    }

    #[test]
    fn quiet_config_draws_nothing() {
        let m = StochasticPerturbation::new(PerturbationConfig::quiet()).unwrap();
        for id in 1..50 {
            let t = started(id);
            let mut rng = TaskRng::new(7, t.id, 0);
            assert!(m.on_admit(&t, &mut rng).is_empty());
            assert!(m.work_delay(&t, &mut rng).is_none());
            assert!(m.temporary_need(&t, &mut rng).is_none());
        }
    }

    #[test]
    fn certain_cancellation_is_announced_before_the_start() {
        let config = PerturbationConfig { cancel_prob: [1.0; 3], ..PerturbationConfig::quiet() };
        let m = StochasticPerturbation::new(config).unwrap();
        for id in 1..50 {
            let t = started(id);
            let events = m.on_admit(&t, &mut TaskRng::new(3, t.id, 0));
            assert_eq!(events.len(), 1);
            let (at, kind) = &events[0];
            assert_eq!(*kind, EventKind::Cancel);
            assert!(*at <= SimTime(600) && *at >= SimTime(570), "{at}");
        }
    }

    #[test]
    fn start_delays_stay_in_range() {
        let config = PerturbationConfig { start_delay_prob: [1.0; 3], ..PerturbationConfig::quiet() };
        let m = StochasticPerturbation::new(config).unwrap();
        for id in 1..50 {
            let t = started(id);
            for (_, kind) in m.on_admit(&t, &mut TaskRng::new(3, t.id, 0)) {
                let EventKind::StartDelay { delay } = kind else {
                    panic!("unexpected {kind}");
                };
                assert!((1..=60).contains(&delay));
            }
        }
    }

    #[test]
    fn largest_class_requirements_never_change() {
        let config = PerturbationConfig { upgrade_prob: 0.5, add_tug_prob: 0.5, ..PerturbationConfig::quiet() };
        let m = StochasticPerturbation::new(config).unwrap();
        for id in 1..50 {
            let t = started(id).with_required(vec![CapabilityClass::T130]);
            assert!(m.on_admit(&t, &mut TaskRng::new(1, t.id, 0)).is_empty());
        }
    }

    #[test]
    fn changed_requirements_are_sorted_and_not_weaker() {
        let config = PerturbationConfig { upgrade_prob: 0.5, add_tug_prob: 0.5, ..PerturbationConfig::quiet() };
        let m = StochasticPerturbation::new(config).unwrap();
        for id in 1..50 {
            let t = started(id).with_required(vec![CapabilityClass::T118]);
            let events = m.on_admit(&t, &mut TaskRng::new(1, t.id, 0));
            assert_eq!(events.len(), 1);
            let EventKind::RequirementChange { required } = &events[0].1 else {
                panic!("expected a requirement change");
            };
            assert!(required.windows(2).all(|w| w[0] <= w[1]));
            assert!(required.iter().max().unwrap() >= &CapabilityClass::T118);
        }
    }

    #[test]
    fn work_delay_fires_inside_the_work_window() {
        let m = StochasticPerturbation::default();
        for id in 1..100 {
            let t = started(id);
            let (at, delay) = m.work_delay(&t, &mut TaskRng::new(5, t.id, 1)).unwrap();
            assert!(at >= t.realized_start && at < t.end_time());
            assert!(at <= t.end_time() + delay);
        }
    }

    #[test]
    fn draws_repeat_for_the_same_stream() {
        let m = StochasticPerturbation::default();
        let t = started(4);
        let a = m.work_delay(&t, &mut TaskRng::new(9, t.id, 1));
        let b = m.work_delay(&t, &mut TaskRng::new(9, t.id, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn a_single_delay_bucket_fixes_the_delay() {
        let mut row = [0.0; 10];
        row[2] = 3.0;
        let config = PerturbationConfig { work_delays: true, work_delay_buckets: [row; 3], ..PerturbationConfig::quiet() };
        let m = StochasticPerturbation::new(config).unwrap();
        for id in 1..50 {
            let t = started(id);
            let (_, delay) = m.work_delay(&t, &mut TaskRng::new(2, t.id, 1)).unwrap();
            // Bucket 2 lengthens the job by half its predicted work.
            assert_eq!(delay, 30);
        }
    }

    #[test]
    fn unusable_delay_buckets_are_rejected() {
        let zero = PerturbationConfig { work_delay_buckets: [[0.0; 10]; 3], ..Default::default() };
        assert!(matches!(StochasticPerturbation::new(zero.clone()), Err(SimError::Config(_))));
        let negative = PerturbationConfig { work_delay_buckets: [[-1.0; 10]; 3], ..Default::default() };
        assert!(matches!(StochasticPerturbation::new(negative), Err(SimError::Config(_))));
        // Unused buckets are not checked.
        assert!(StochasticPerturbation::new(PerturbationConfig { work_delays: false, ..zero }).is_ok());
    }

    #[test]
    fn invalid_probabilities_are_rejected() {
        let config = PerturbationConfig { cancel_prob: [1.5, 0.0, 0.0], ..Default::default() };
        assert!(matches!(StochasticPerturbation::new(config), Err(SimError::Config(_))));
    }

    #[test]
    fn chained_models_concatenate_admission_events() {
        let cancel = StochasticPerturbation::new(PerturbationConfig {
            cancel_prob: [1.0; 3],
            ..PerturbationConfig::quiet()
        })
        .unwrap();
        let m = NoPerturbation.then(cancel);
        let t = started(2);
        assert_eq!(m.on_admit(&t, &mut TaskRng::new(0, t.id, 0)).len(), 1);
        assert!(m.work_delay(&t, &mut TaskRng::new(0, t.id, 1)).is_none());
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scenarios {
    use super::*;

    #[test]
    fn single_job_runs_confirm_start_end() {
        let mut s = sim(vec![job(1, 1, 120)], vec![tug(0, PIER_A)], GreedyProfit::default())
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        let result = s.run(&mut rec).unwrap();

        let kinds: Vec<_> = rec.events.iter().map(|e| (e.0, e.2)).collect();
        assert_eq!(
            kinds,
            vec![
                (SimTime(120), "confirm"),
                (SimTime(120), "start_work"),
                (SimTime(180), "end_work"),
            ]
        );
        assert!(rec.ended);

        let t = task(&s, 1);
        assert_eq!(t.state, TaskState::Processed);
        assert_eq!(t.tugs, vec![TugId(0)]);
        let tug0 = s.entities().tug(TugId(0)).unwrap();
        assert!(tug0.is_free());
        assert_eq!(tug0.next_available, SimTime(180));
        assert_eq!(tug0.history.len(), 1);
        assert_eq!(tug0.history[0].work_end, Some(SimTime(180)));

        assert_eq!(result.completed, 1);
        assert_eq!(result.canceled, 0);
        assert_eq!(result.revenue, CapabilityClass::T117.hourly_rate());
        assert_eq!(result.moving_cost, 0.0);
        assert_eq!(result.profit, result.revenue);
        assert_eq!(result.exact_ratio(), 1.0);
        assert_eq!(result.stats.events, 3);
        assert_eq!(result.stats.dispatch_rounds, 1);
    }

    #[test]
    fn requirement_change_after_confirm_reverts_and_redispatches() {
        let tr = crossing();
        assert!(tr > 10);
        let change = EventKind::RequirementChange { required: vec![CapabilityClass::T117; 2] };
        let mut s = sim(vec![job(1, 1, 120)], vec![tug(0, PIER_B), tug(1, PIER_B)], GreedyProfit::default())
            .scripted(vec![scripted(1, 110, change)])
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        let result = s.run(&mut rec).unwrap();

        // One tug confirmed at its departure, then released by the change.
        assert_eq!(rec.kinds_at(120 - tr), vec!["confirm"]);
        assert_eq!(rec.kinds_at(110), vec!["requirement_change", "confirm"]);
        assert!(rec.dispatches.contains(&SimTime(110)));

        let t = task(&s, 1);
        assert_eq!(t.state, TaskState::Processed);
        assert_eq!(t.tugs.len(), 2);
        assert_eq!(t.realized_start, SimTime(110 + tr));
        for id in [0, 1] {
            // The released stint is gone; only the final assignment remains.
            assert_eq!(s.entities().tug(TugId(id)).unwrap().history.len(), 1);
        }
        assert_eq!(result.waiting_minutes, 110 + tr - 120);
    }

    #[test]
    fn temporary_need_spawns_a_derived_job_and_stretches_the_parent() {
        let tr = crossing();
        let mut s = sim(vec![job(1, 1, 120)], vec![tug(0, PIER_A), tug(1, PIER_B)], NearestCapability::default())
            .scripted(vec![scripted(1, 150, EventKind::TemporaryNeed { extra: vec![CapabilityClass::T117] })])
            .build()
            .unwrap();
        let result = s.run(&mut NoopObserver).unwrap();

        let derived = task(&s, -1);
        assert_eq!(derived.state, TaskState::Processed);
        assert_eq!(derived.tugs, vec![TugId(1)]);
        assert_eq!(derived.scheduled_start, SimTime(150));
        assert_eq!(derived.realized_start, SimTime(150 + tr));
        assert_eq!(derived.work_time, 30);

        let parent = task(&s, 1);
        assert_eq!(parent.state, TaskState::Processed);
        assert_eq!(parent.tugs, vec![TugId(0), TugId(1)]);
        assert_eq!(parent.extra_wait, tr);
        assert_eq!(parent.work_time, 60 + tr);
        assert_eq!(parent.end_time(), SimTime(180 + tr));
        assert_eq!(parent.required, vec![CapabilityClass::T117; 2]);
        for id in [0, 1] {
            assert_eq!(s.entities().tug(TugId(id)).unwrap().next_available, SimTime(180 + tr));
        }

        assert_eq!(result.tasks.len(), 1);
        let o = &result.tasks[0];
        assert!(o.temporary_need);
        assert_eq!(o.tugs.len(), 2);
        assert_eq!(o.matches.exact, 2);
        // Tug 0 billed from 120, tug 1 from its departure at 150.
        let billed = tug_model::billing::billed_units(60 + tr) + tug_model::billing::billed_units(30 + tr);
        assert_eq!(o.revenue, CapabilityClass::T117.hourly_rate() * billed);
        assert!(o.moving_cost > 0.0);
    }

    #[test]
    fn failed_help_request_reruns_the_policy_without_help() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let policy = Recording { inner: GreedyProfit::default(), calls: Arc::clone(&calls) };
        let mut options = SimOptions::default();
        options.help.failure_prob = 1.0;
        let mut s = SimBuilder::new(options, vec![job(1, 1, 120), job(2, 1, 200)], vec![tug(0, PIER_A)], policy, services())
            .help_tugs(vec![tug(10, PIER_A)])
            .build()
            .unwrap();
        let result = s.run(&mut NoopObserver).unwrap();

        let calls = calls.lock().unwrap();
        assert!(!calls.is_empty());
        assert_eq!(calls.len() % 2, 0);
        for pair in calls.chunks(2) {
            assert_eq!(pair, &[(true, 1), (false, 0)]);
        }
        assert_eq!(result.stats.help_failures, result.stats.dispatch_rounds);
        assert_eq!(result.stats.policy_invocations, 2 * result.stats.dispatch_rounds);
        assert!(s.entities().tug(TugId(10)).unwrap().history.is_empty());
        assert_eq!(result.completed, 2);
    }

    #[test]
    fn help_is_not_offered_without_a_help_fleet() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let policy = Recording { inner: GreedyProfit::default(), calls: Arc::clone(&calls) };
        let mut s = sim(vec![job(1, 1, 120)], vec![tug(0, PIER_A)], policy).build().unwrap();
        s.run(&mut NoopObserver).unwrap();
        assert!(calls.lock().unwrap().iter().all(|&c| c == (false, 0)));
    }

    #[test]
    fn end_work_runs_before_a_start_delay_at_the_same_minute() {
        // Job 2 is admitted (and its delay queued) before job 1's EndWork
        // exists, so only the precedence rule puts EndWork first.
        let mut s = sim(vec![job(1, 1, 120), job(2, 1, 170)], vec![tug(0, PIER_A)], GreedyProfit::default())
            .scripted(vec![scripted(2, 180, EventKind::StartDelay { delay: 20 })])
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        s.run(&mut rec).unwrap();

        assert_eq!(rec.kinds_at(180), vec!["end_work", "start_delay"]);
        let t = task(&s, 2);
        assert_eq!(t.state, TaskState::Processed);
        assert_eq!(t.scheduled_start, SimTime(190));
        assert_eq!(t.realized_start, SimTime(190));
    }

    #[test]
    fn cancel_is_idempotent_and_frees_nothing_twice() {
        let mut s = sim(vec![job(1, 1, 120)], vec![tug(0, PIER_A)], GreedyProfit::default())
            .scripted(vec![scripted(1, 100, EventKind::Cancel), scripted(1, 105, EventKind::Cancel)])
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        let result = s.run(&mut rec).unwrap();

        // The second Cancel finds a finished job and is skipped.
        assert_eq!(rec.events.iter().filter(|e| e.2 == "cancel").count(), 1);
        assert_eq!(task(&s, 1).state, TaskState::Canceled);
        assert!(s.entities().tug(TugId(0)).unwrap().history.is_empty());
        assert_eq!(result.canceled, 1);
        assert_eq!(result.revenue, 0.0);
        assert!(s.visible().is_empty());
    }

    #[test]
    fn confirmed_job_canceled_before_start_pins_its_tug() {
        let tr = crossing();
        let mut s = sim(vec![job(1, 1, 120)], vec![tug(0, PIER_B)], GreedyProfit::default())
            .scripted(vec![scripted(1, 115, EventKind::Cancel)])
            .build()
            .unwrap();
        let result = s.run(&mut NoopObserver).unwrap();

        let t = task(&s, 1);
        assert_eq!(t.state, TaskState::Canceled);
        let tug0 = s.entities().tug(TugId(0)).unwrap();
        assert!(tug0.is_free());
        assert_eq!(tug0.position, PIER_A);
        assert_eq!(tug0.next_available, SimTime(115));
        assert_eq!(tug0.history[0].depart, SimTime(120 - tr));
        assert_eq!(tug0.history[0].work_end, Some(SimTime(115)));
        // The trip out is still paid for.
        assert!(result.moving_cost > 0.0);
        assert_eq!(result.profit, -result.moving_cost);
    }

    #[test]
    fn unstaffable_job_is_deferred_then_starves() {
        let mut options = SimOptions::default();
        options.max_deferrals = 3;
        let mut s = SimBuilder::new(options, vec![job(1, 2, 120)], vec![tug(0, PIER_A)], GreedyProfit::default(), services())
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        let err = s.run(&mut rec).unwrap_err();

        assert!(matches!(err, SimError::Starved { task: TaskId(1), attempts: 3 }), "{err}");
        assert_eq!(rec.deferrals, vec![(TaskId(1), 1), (TaskId(1), 2)]);
        assert_eq!(task(&s, 1).realized_start, SimTime(140));
    }

    #[test]
    fn deferral_waits_for_a_late_tug() {
        // Two-tug job, second tug only joins after a long first job.
        let mut s = sim(
            vec![job(1, 1, 60), job(2, 2, 100)],
            vec![tug(0, PIER_A), tug(1, PIER_A)],
            GreedyProfit::default(),
        )
        .build()
        .unwrap();
        let result = s.run(&mut NoopObserver).unwrap();
        assert_eq!(result.completed, 2);
        // Job 1 holds a tug until 120, so job 2 waits for it.
        assert_eq!(task(&s, 2).realized_start, SimTime(120));
        assert_eq!(result.waiting_minutes, 20);
    }

    #[test]
    fn stall_guard_wakes_the_loop_for_an_uncrewed_job() {
        // The only tug comes on shift at 08:00; a long start delay pushes
        // the uncrewed job's Confirm far out with nothing else queued.
        let mut options = SimOptions::default();
        options.duty_floor = 0;
        let day_tug = tug(0, PIER_A).with_shift(tug_model::DutyShift::Day);
        let mut s = SimBuilder::new(options, vec![job(1, 1, 120)], vec![day_tug], GreedyProfit::default(), services())
            .scripted(vec![scripted(1, 100, EventKind::StartDelay { delay: 380 })])
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        let result = s.run(&mut rec).unwrap();

        assert!(result.stats.stall_guards > 0);
        assert!(rec.events.iter().any(|e| e.2 == "routine"));
        assert_eq!(task(&s, 1).realized_start, SimTime(500));
        assert_eq!(result.completed, 1);
    }

    #[test]
    fn crewed_job_waits_for_a_far_confirm_without_waking_the_loop() {
        let mut options = SimOptions::default();
        options.start_delay_tolerance = 0;
        let mut s = SimBuilder::new(options, vec![job(1, 1, 120)], vec![tug(0, PIER_A)], GreedyProfit::default(), services())
            .scripted(vec![scripted(1, 100, EventKind::StartDelay { delay: 200 })])
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        let result = s.run(&mut rec).unwrap();

        assert_eq!(result.stats.stall_guards, 0);
        assert!(rec.events.iter().all(|e| e.2 != "routine"));
        assert_eq!(task(&s, 1).realized_start, SimTime(320));
        assert_eq!(result.completed, 1);
    }

    #[test]
    fn confirm_with_a_held_tug_is_deferred() {
        let mut s = sim(vec![job(1, 1, 120)], vec![tug(0, PIER_A)], GreedyProfit::default())
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        // Admission at 60 crews the job with tug 0.
        assert!(s.step(&mut rec).unwrap());
        assert_eq!(task(&s, 1).tugs, vec![TugId(0)]);

        s.entities
            .tug_mut(TugId(0))
            .unwrap()
            .engage(TaskId(99), SimTime(60), SimTime(60), SimTime(125), PIER_A);
        assert!(s.step(&mut rec).unwrap());
        assert_eq!(rec.deferrals, vec![(TaskId(1), 1)]);
        assert_eq!(task(&s, 1).state, TaskState::UnprocessedUnassigned);

        s.entities.tug_mut(TugId(0)).unwrap().disengage(TaskId(99), SimTime(125)).unwrap();
        let result = s.run(&mut rec).unwrap();
        assert_eq!(result.completed, 1);
        assert!(task(&s, 1).realized_start >= SimTime(125));
        assert_eq!(result.stats.deferrals, 1);
    }

    #[test]
    fn crossed_temporary_needs_settle_in_staging_order() {
        // Each job's only tug is the other job's only candidate helper.
        let tr = crossing();
        let need = || EventKind::TemporaryNeed { extra: vec![CapabilityClass::T117] };
        let mut s = sim(
            vec![job(1, 1, 120), job(2, 1, 120)],
            vec![tug(0, PIER_A), tug(1, PIER_A)],
            NearestCapability::default(),
        )
        .scripted(vec![scripted(1, 150, need()), scripted(2, 150, need())])
        .build()
        .unwrap();
        let mut steps = 0;
        while s.step(&mut NoopObserver).unwrap() {
            steps += 1;
            assert!(steps < 1_000, "no progress at {}", s.now());
        }

        // -2 is staged first and may not wait on job 1's tug, so only -1
        // is crewed; job 2 ends on time and takes -2 with it.
        let (d1, d2) = (task(&s, -1), task(&s, -2));
        assert_eq!(d1.state, TaskState::Processed);
        assert_eq!(d1.tugs, task(&s, 2).tugs);
        assert_eq!(d1.realized_start, SimTime(180 + tr));
        assert_eq!(d2.state, TaskState::Canceled);
        assert_eq!(task(&s, 2).end_time(), SimTime(180));
        assert_eq!(task(&s, 1).end_time(), SimTime(210 + tr));
    }

    #[test]
    fn scripted_work_delay_moves_the_end() {
        let mut s = sim(vec![job(1, 1, 120)], vec![tug(0, PIER_A)], GreedyProfit::default())
            .scripted(vec![scripted(1, 150, EventKind::WorkDelay { delay: 25 })])
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        s.run(&mut rec).unwrap();

        assert_eq!(rec.kinds_at(205), vec!["end_work"]);
        assert!(rec.kinds_at(180).is_empty());
        assert_eq!(s.entities().tug(TugId(0)).unwrap().next_available, SimTime(205));
    }
}

// ── Whole runs ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod runs {
    use super::*;
    use crate::{PerturbationConfig, ReplicationSummary, run_replications};
    use tug_model::{DutyShift, TugState};

    /// `n` jobs, one every `spacing` minutes from 02:00.
    fn jobs(n: i32, spacing: i64) -> Vec<Task> {
        (1..=n)
            .map(|i| {
                let weight = [3_000.0, 12_000.0, 40_000.0, 70_000.0][i as usize % 4];
                let tugs = 1 + (i as usize % 2);
                let mut t = Task::new(
                    TaskId(i),
                    Ship { id: ShipId(i as u32), weight },
                    Movement::ALL[i as usize % 3],
                    PierId(i as u32 % 2),
                    PierId((i as u32 + 1) % 2),
                    SimTime(120 + spacing * i as i64),
                    tugs,
                )
                .unwrap();
                t.wind_level = 1 + (i % 7) as u8;
                t
            })
            .collect()
    }

    fn day_of_jobs() -> Vec<Task> {
        jobs(10, 45)
    }

    fn fleet() -> Vec<Tug> {
        CapabilityClass::ALL
            .into_iter()
            .chain(CapabilityClass::ALL)
            .enumerate()
            .map(|(i, class)| {
                let at = if i % 2 == 0 { PIER_A } else { PIER_B };
                Tug::new(TugId(i as u32), class, 3_200, at)
            })
            .collect()
    }

    fn policies() -> Vec<Box<dyn DispatchPolicy>> {
        vec![
            Box::new(GreedyProfit::default()),
            Box::new(NearestCapability::default()),
            Box::new(TimelineInsertion::default()),
        ]
    }

    fn build(policy: Box<dyn DispatchPolicy>, seed: u64) -> Simulator {
        SimBuilder::new(SimOptions::default().with_seed(seed), day_of_jobs(), fleet(), policy, services())
            .perturbation(StochasticPerturbation::default())
            .build()
            .unwrap()
    }

    fn check(s: &Simulator, result: &RunResult, n: usize) {
        let name = &result.policy;
        for t in s.entities().tasks() {
            assert!(t.state.is_terminal(), "{name}: {} left {}", t.id, t.state);
            assert!(t.realized_start >= t.scheduled_start, "{name}: {} started early", t.id);
        }
        for tug in s.entities().tugs() {
            assert!(tug.is_free(), "{name}: {} still busy", tug.id);
            for pair in tug.history.windows(2) {
                let end = pair[0].work_end.expect("closed stint");
                assert!(end <= pair[1].depart, "{name}: {} double booked", tug.id);
            }
        }
        assert_eq!(result.tasks.len(), n);
        assert_eq!(result.completed + result.canceled, n);
        let profit: f64 = result.tasks.iter().map(|o| o.profit).sum();
        assert!((profit - result.profit).abs() < 1e-6);
    }

    /// Step until done, failing instead of hanging if the loop stops
    /// making progress.
    fn run_capped<O: SimObserver>(s: &mut Simulator, observer: &mut O, cap: usize) -> RunResult {
        let mut steps = 0;
        while s.step(observer).unwrap() {
            steps += 1;
            assert!(steps < cap, "still running after {cap} steps at {}", s.now());
        }
        s.result()
    }

    /// Checks after every event that tug and job states agree: a tug is
    /// busy exactly while one open job holds it.
    #[derive(Default)]
    struct BusyInvariant {
        checked: usize,
    }

    impl SimObserver for BusyInvariant {
        fn on_event(&mut self, event: &Event, _outcome: Outcome, entities: &EntityPool) {
            self.checked += 1;
            let at = event.time;
            for tug in entities.tugs() {
                let open: Vec<TaskId> =
                    tug.history.iter().filter(|s| s.work_end.is_none()).map(|s| s.task).collect();
                match tug.state {
                    TugState::Free => assert!(open.is_empty(), "{at}: {} free but holds {open:?}", tug.id),
                    TugState::Busy => {
                        assert_eq!(open.len(), 1, "{at}: {} busy with {open:?}", tug.id);
                        let holder = entities.task(open[0]).unwrap();
                        assert!(holder.state.holds_tugs(), "{at}: {} held by {} ({})", tug.id, holder.id, holder.state);
                        assert!(holder.tugs.contains(&tug.id), "{at}: {} not on {}", tug.id, holder.id);
                    }
                    TugState::Unavailable => {}
                }
            }
            for task in entities.tasks().iter().filter(|t| !t.is_derived() && t.state.holds_tugs()) {
                for &id in &task.tugs {
                    let tug = entities.tug(id).unwrap();
                    assert_eq!(tug.state, TugState::Busy, "{at}: {} on {} is {:?}", id, task.id, tug.state);
                }
            }
        }
    }

    /// Day and night crews for every class plus an auxiliary fleet.
    fn shifted_fleet() -> (Vec<Tug>, Vec<Tug>) {
        let own = fleet()
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                let shift = if i < CapabilityClass::ALL.len() { DutyShift::Day } else { DutyShift::Night };
                t.with_shift(shift)
            })
            .collect();
        let help = CapabilityClass::ALL
            .into_iter()
            .enumerate()
            .map(|(i, class)| Tug::new(TugId(100 + i as u32), class, 3_600, PIER_B))
            .collect();
        (own, help)
    }

    fn rough_weather() -> StochasticPerturbation {
        StochasticPerturbation::new(PerturbationConfig {
            upgrade_prob:       0.15,
            add_tug_prob:       0.2,
            add_tug_prob_windy: 0.4,
            start_delay_prob:   [0.5; 3],
            cancel_prob:        [0.1; 3],
            temp_need_prob:     [0.5; 3],
            ..PerturbationConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn every_policy_finishes_every_job() {
        for seed in 0..4 {
            for policy in policies() {
                let mut s = build(policy, seed);
                let result = s.run(&mut NoopObserver).unwrap();
                check(&s, &result, 10);
            }
        }
    }

    #[test]
    fn constant_temporary_needs_still_terminate() {
        let config = PerturbationConfig { temp_need_prob: [1.0; 3], ..PerturbationConfig::default() };
        for seed in 0..3 {
            for policy in policies() {
                let mut s = SimBuilder::new(SimOptions::default().with_seed(seed), jobs(40, 20), fleet(), policy, services())
                    .perturbation(StochasticPerturbation::new(config.clone()).unwrap())
                    .build()
                    .unwrap();
                let result = run_capped(&mut s, &mut NoopObserver, 50_000);
                check(&s, &result, 40);
                assert!(result.tasks.iter().any(|o| o.temporary_need));
            }
        }
    }

    #[test]
    fn mixed_shifts_with_help_keep_tugs_consistent() {
        for seed in 0..8 {
            for policy in policies() {
                let mut options = SimOptions::default().with_seed(seed);
                options.help.failure_prob = 0.3;
                let (own, help) = shifted_fleet();
                // Two days of traffic, a job every 25 minutes.
                let mut s = SimBuilder::new(options, jobs(115, 25), own, policy, services())
                    .help_tugs(help)
                    .perturbation(rough_weather())
                    .build()
                    .unwrap();
                let mut invariant = BusyInvariant::default();
                let result = run_capped(&mut s, &mut invariant, 200_000);
                check(&s, &result, 115);
                assert!(invariant.checked > 0);
            }
        }
    }

    #[test]
    fn same_seed_same_result() {
        let a = build(Box::new(GreedyProfit::default()), 11).run(&mut NoopObserver).unwrap();
        let b = build(Box::new(GreedyProfit::default()), 11).run(&mut NoopObserver).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn replications_come_back_in_seed_order() {
        let seeds = [3, 1, 2];
        let results = run_replications(&seeds, |seed| {
            SimBuilder::new(
                SimOptions::default().with_seed(seed),
                day_of_jobs(),
                fleet(),
                TimelineInsertion::default(),
                services(),
            )
            .perturbation(StochasticPerturbation::default())
            .build()
        })
        .unwrap();
        assert_eq!(results.iter().map(|r| r.seed).collect::<Vec<_>>(), vec![3, 1, 2]);

        let summary = ReplicationSummary::of(&results);
        assert_eq!(summary.runs, 3);
        assert!(summary.min_profit <= summary.mean_profit && summary.mean_profit <= summary.max_profit);
        assert!(summary.std_profit >= 0.0);
    }
}
