//! The `Simulator` struct and its event loop.

use std::collections::{HashMap, VecDeque};

use tug_core::{EventId, Minutes, SimRng, SimTime, TaskId, TaskRng, TugId};
use tug_dispatch::{DispatchPlan, DispatchPolicy, DispatchRequest, LocalFleet};
use tug_event::{Event, EventKind, EventQueue, HandlerContext, Outcome, handle};
use tug_model::{EntityPool, InvariantViolation, Task, TaskState, Tug};
use tug_port::PortServices;

use crate::outcome::{self, RunResult, RunStats};
use crate::roster::DutyRoster;
use crate::{PerturbationModel, SimError, SimObserver, SimOptions, SimResult};

/// Per-job RNG streams.
const ADMIT_STREAM: u64 = 0;
const WORK_DELAY_STREAM: u64 = 1;
const TEMP_NEED_STREAM: u64 = 2;

// ── Milestones ────────────────────────────────────────────────────────────────

/// The three events every job carries a handle to.
#[derive(Copy, Clone, Debug)]
enum Milestone {
    Confirm,
    Start,
    End,
}

impl Milestone {
    fn kind(self) -> EventKind {
        match self {
            Milestone::Confirm => EventKind::Confirm,
            Milestone::Start => EventKind::StartWork,
            Milestone::End => EventKind::EndWork,
        }
    }

    fn slot(self, task: &mut Task) -> &mut Option<EventId> {
        match self {
            Milestone::Confirm => &mut task.confirm_event,
            Milestone::Start => &mut task.start_event,
            Milestone::End => &mut task.end_event,
        }
    }
}

/// Move the job's milestone event to `time`, queueing a fresh one if the
/// old event already fired.
fn retime(queue: &mut EventQueue, task: &mut Task, milestone: Milestone, time: SimTime) {
    if let Some(id) = *milestone.slot(task) {
        if queue.reschedule(id, time) {
            return;
        }
    }
    let id = queue.push(Some(task.id), time, milestone.kind());
    *milestone.slot(task) = Some(id);
    task.events.push(id);
}

// ── Simulator ─────────────────────────────────────────────────────────────────

/// The main simulation runner.
///
/// Each step either admits the jobs whose dispatch window has opened or
/// pops the next event, whichever comes first:
///
/// 1. **Admit**: jobs with `scheduled_start ≤ now + window` get their
///    Confirm and StartWork events plus whatever the perturbation model
///    announces for them, then the duty pool is refreshed and the policy
///    runs.
/// 2. **Event**: the event is applied by its handler, its follow-ups are
///    queued (EndWork after StartWork, derived jobs after a temporary
///    need, …) and the policy runs again if the event calls for it.
///
/// After a dispatch round every proposal is checked against travel times
/// and tug availability, and the jobs' Confirm and StartWork events are
/// moved to the checked times.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Simulator {
    pub(crate) options:      SimOptions,
    pub(crate) entities:     EntityPool,
    pub(crate) queue:        EventQueue,
    pub(crate) policy:       Box<dyn DispatchPolicy>,
    pub(crate) services:     PortServices,
    pub(crate) perturbation: Box<dyn PerturbationModel>,
    /// Jobs not yet admitted, by scheduled start.
    pub(crate) backlog:      VecDeque<TaskId>,
    /// Admitted jobs that have not ended or been canceled.
    pub(crate) visible:      Vec<TaskId>,
    pub(crate) scripted:     HashMap<TaskId, Vec<(SimTime, EventKind)>>,
    pub(crate) roster:       DutyRoster,
    pub(crate) pool:         Vec<TugId>,
    pub(crate) help:         Vec<TugId>,
    pub(crate) now:          SimTime,
    pub(crate) rng:          SimRng,
    /// Consecutive deferrals per job.
    pub(crate) deferrals:    HashMap<TaskId, u32>,
    pub(crate) stats:        RunStats,
}

impl Simulator {
    // ── Public API ────────────────────────────────────────────────────────

    /// Run until no job is waiting for admission and the queue is empty.
    ///
    /// Use [`NoopObserver`][crate::NoopObserver] if you don't need callbacks.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<RunResult> {
        while self.step(observer)? {}
        let result = self.result();
        observer.on_sim_end(&result);
        Ok(result)
    }

    /// Advance by one admission batch or one event.  Returns `false` once
    /// there is nothing left to do.
    pub fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<bool> {
        let next_admit = self.next_admission();
        let next_event = self.queue.peek_time();

        match (next_admit, next_event) {
            (None, None) => return Ok(false),
            (Some(admit), event) if event.is_none_or(|e| admit <= e) => {
                self.now = self.now.max(admit);
                self.admit_due(observer)?;
                self.refresh_pool(observer)?;
                self.dispatch(observer)?;
            }
            _ => {
                let Some(event) = self.queue.pop() else {
                    return Ok(false);
                };
                self.now = self.now.max(event.time);
                self.stats.events += 1;
                self.refresh_pool(observer)?;
                if self.process(event, observer)? {
                    self.dispatch(observer)?;
                }
            }
        }
        self.stall_guard(observer);
        Ok(true)
    }

    /// Settle the jobs and total the run.  Valid at any point; jobs still
    /// open count as neither completed nor canceled.
    pub fn result(&mut self) -> RunResult {
        let policy = self.policy.name().to_string();
        outcome::aggregate(&mut self.entities, &policy, self.options.seed, self.stats.clone())
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn entities(&self) -> &EntityPool {
        &self.entities
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn options(&self) -> &SimOptions {
        &self.options
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// The duty pool as of the last refresh.
    pub fn duty_pool(&self) -> &[TugId] {
        &self.pool
    }

    /// Admitted jobs still open.
    pub fn visible(&self) -> &[TaskId] {
        &self.visible
    }

    // ── Admission ─────────────────────────────────────────────────────────

    /// When the next backlog job's window opens.
    fn next_admission(&self) -> Option<SimTime> {
        let &id = self.backlog.front()?;
        let task = self.entities.get_task(id)?;
        Some(task.scheduled_start - self.options.window)
    }

    fn admit_due<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let horizon = self.now + self.options.window;
        while let Some(&id) = self.backlog.front() {
            if self.entities.task(id)?.scheduled_start > horizon {
                break;
            }
            self.backlog.pop_front();
            self.admit(id, observer)?;
        }
        Ok(())
    }

    fn admit<O: SimObserver>(&mut self, id: TaskId, observer: &mut O) -> SimResult<()> {
        let now = self.now;
        let task = self.entities.task(id)?;
        if task.state.is_terminal() {
            return Ok(());
        }
        let mut rng = TaskRng::new(self.options.seed, id, ADMIT_STREAM);
        let mut extra = self.perturbation.on_admit(task, &mut rng);
        extra.extend(self.scripted.remove(&id).unwrap_or_default());

        let task = self.entities.task_mut(id)?;
        let start = task.scheduled_start.max(now);
        retime(&mut self.queue, task, Milestone::Confirm, start);
        retime(&mut self.queue, task, Milestone::Start, start);
        for (time, kind) in extra {
            let ev = self.queue.push(Some(id), time.max(now), kind);
            task.events.push(ev);
        }
        self.visible.push(id);
        observer.on_admit(now, task);
        Ok(())
    }

    fn refresh_pool<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let pool = self.roster.refresh(&mut self.entities, self.now)?;
        if pool != self.pool {
            observer.on_pool(self.now, &pool);
            self.pool = pool;
        }
        Ok(())
    }

    // ── Event processing ──────────────────────────────────────────────────

    /// Apply one event and queue its follow-ups.  Returns `true` if the
    /// policy must run again.
    fn process<O: SimObserver>(&mut self, event: Event, observer: &mut O) -> SimResult<bool> {
        let mut work_before = 0;
        if let Some(id) = event.task {
            let task = self.entities.task(id)?;
            if task.state.is_terminal() {
                return Ok(false);
            }
            if event.kind == EventKind::Confirm && !self.crew_ready(task) {
                self.defer(event, observer)?;
                return Ok(true);
            }
            work_before = task.work_time;
        }

        let ctx = HandlerContext {
            services:              &self.services,
            start_delay_tolerance: self.options.start_delay_tolerance,
        };
        let outcome = handle(&mut self.entities, &event, &ctx)?;
        observer.on_event(&event, outcome, &self.entities);

        let mut redispatch = outcome == Outcome::Redispatch || event.kind.triggers_dispatch();
        let Some(id) = event.task else {
            return Ok(redispatch);
        };
        if outcome == Outcome::Ignored {
            return Ok(redispatch);
        }

        match &event.kind {
            EventKind::Confirm => {
                self.deferrals.remove(&id);
                if let Some(parent) = id.parent() {
                    let tugs = self.entities.task(id)?.tugs.clone();
                    self.entities.task_mut(parent)?.tugs.extend(tugs);
                    redispatch = true;
                }
            }
            EventKind::StartWork if !id.is_derived() => self.after_start(id)?,
            EventKind::WorkDelay { .. } => {
                let task = self.entities.task_mut(id)?;
                let applied = task.work_time - work_before;
                let end = task.end_time();
                retime(&mut self.queue, task, Milestone::End, end);
                if let Some(derived) = self.open_derived(id) {
                    let d = self.entities.task_mut(derived)?;
                    if d.state.holds_tugs() {
                        d.work_time += applied;
                    }
                }
            }
            EventKind::StartDelay { .. } => {
                let task = self.entities.task_mut(id)?;
                if task.state == TaskState::UnprocessedAssigned {
                    let realized = task.realized_start;
                    retime(&mut self.queue, task, Milestone::Start, realized);
                }
            }
            EventKind::Cancel => {
                self.visible.retain(|&t| t != id);
                if let Some(derived) = self.open_derived(id) {
                    self.visible.retain(|&t| t != derived);
                    self.entities.task_mut(derived)?.state = TaskState::Canceled;
                }
            }
            EventKind::TemporaryNeed { extra } if outcome == Outcome::Redispatch => {
                self.spawn_derived(id, extra.clone())?;
            }
            EventKind::EndWork => {
                self.visible.retain(|&t| t != id);
                if let Some(derived) = self.open_derived(id) {
                    self.visible.retain(|&t| t != derived);
                    let d = self.entities.task_mut(derived)?;
                    d.state = if d.state.holds_tugs() { TaskState::Processed } else { TaskState::Canceled };
                }
            }
            _ => {}
        }
        Ok(redispatch)
    }

    /// Whether the job has a full crew and every tug of it is free to go.
    fn crew_ready(&self, task: &Task) -> bool {
        task.tugs.len() == task.required.len()
            && task.tugs.iter().all(|&t| self.entities.tug(t).is_ok_and(Tug::is_free))
    }

    /// A Confirm found its job without a full crew, or with a tug still held
    /// elsewhere: push the job back by the retry interval and try again then.
    fn defer<O: SimObserver>(&mut self, event: Event, observer: &mut O) -> SimResult<()> {
        let Some(id) = event.task else {
            return Ok(());
        };
        let attempts = self.deferrals.entry(id).or_insert(0);
        *attempts += 1;
        let attempts = *attempts;
        if attempts >= self.options.max_deferrals {
            return Err(SimError::Starved { task: id, attempts });
        }
        self.stats.deferrals += 1;

        let retry = self.now + self.options.retry_interval;
        let task = self.entities.task_mut(id)?;
        task.realized_start = task.realized_start.max(retry);
        let realized = task.realized_start;
        self.queue.requeue(event, realized);
        retime(&mut self.queue, task, Milestone::Start, realized);
        observer.on_deferral(self.now, id, attempts);
        Ok(())
    }

    /// Ask the perturbation model about a job that just started.
    fn after_start(&mut self, id: TaskId) -> SimResult<()> {
        let now = self.now;
        let seed = self.options.seed;
        let task = self.entities.task(id)?;

        let mut rng = TaskRng::new(seed, id, WORK_DELAY_STREAM);
        let delay = self.perturbation.work_delay(task, &mut rng);
        let mut rng = TaskRng::new(seed, id, TEMP_NEED_STREAM);
        let need = self.perturbation.temporary_need(task, &mut rng);

        let task = self.entities.task_mut(id)?;
        match delay {
            Some((at, delay)) => {
                let ev = self.queue.push(Some(id), at.max(now), EventKind::WorkDelay { delay });
                task.events.push(ev);
            }
            None => {
                let end = task.end_time();
                retime(&mut self.queue, task, Milestone::End, end);
            }
        }
        if let Some((at, extra)) = need {
            let ev = self.queue.push(Some(id), at.max(now), EventKind::TemporaryNeed { extra });
            task.events.push(ev);
        }
        Ok(())
    }

    /// The derived job of `parent`, if it exists and is still open.
    fn open_derived(&self, parent: TaskId) -> Option<TaskId> {
        self.entities
            .get_task(parent.derived())
            .filter(|d| !d.state.is_terminal())
            .map(|d| d.id)
    }

    fn spawn_derived(&mut self, parent: TaskId, extra: Vec<tug_core::CapabilityClass>) -> SimResult<()> {
        let now = self.now;
        let mut derived = Task::derived_from(self.entities.task(parent)?, extra, now);
        retime(&mut self.queue, &mut derived, Milestone::Confirm, now);
        retime(&mut self.queue, &mut derived, Milestone::Start, now);
        self.visible.push(derived.id);
        self.entities.insert_task(derived)?;
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    fn dispatch<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let mut jobs: Vec<TaskId> = self
            .visible
            .iter()
            .copied()
            .filter(|&id| {
                self.entities
                    .get_task(id)
                    .is_some_and(|t| t.state == TaskState::UnprocessedUnassigned)
            })
            .collect();
        if jobs.is_empty() {
            return Ok(());
        }
        jobs.sort_by_key(|&id| (self.entities.get_task(id).map(|t| t.scheduled_start), id));
        self.stats.dispatch_rounds += 1;

        let with_help = !self.help.is_empty();
        let mut plan = self.invoke(&jobs, with_help)?;
        let mut help_failed = false;
        if with_help && self.rng.gen_bool(self.options.help.failure_prob) {
            help_failed = true;
            self.stats.help_failures += 1;
            plan = self.invoke(&jobs, false)?;
        }
        self.apply_plan(&jobs, &plan)?;
        observer.on_dispatch(self.now, &plan, help_failed);
        Ok(())
    }

    fn invoke(&mut self, jobs: &[TaskId], allow_help: bool) -> SimResult<DispatchPlan> {
        self.stats.policy_invocations += 1;
        let entities = &self.entities;
        let tugs = |ids: &[TugId]| ids.iter().map(|&id| entities.tug(id)).collect::<Result<Vec<&Tug>, _>>();

        let request = DispatchRequest {
            now:            self.now,
            jobs:           jobs
                .iter()
                .map(|&id| entities.task(id))
                .collect::<Result<Vec<_>, InvariantViolation>>()?,
            pool:           tugs(&self.pool)?,
            help:           if allow_help { tugs(&self.help)? } else { Vec::new() },
            allow_help,
            help_threshold: self.options.help.threshold,
            entities,
            services:       &self.services,
        };
        self.policy.dispatch(&request).map_err(|source| SimError::Dispatch {
            policy: self.policy.name().to_string(),
            source,
        })
    }

    /// Check each proposal against travel and availability and re-time the
    /// jobs' Confirm and StartWork events accordingly.
    ///
    /// Jobs are timed in one ordered pass: derived jobs first in staging
    /// order, since each may stretch its parent's tugs, then the rest by
    /// start.  Proposals for jobs that were not offered are ignored; jobs
    /// without a proposal, with the wrong number of tugs, or (derived jobs)
    /// with a tug whose release can still move, stay unassigned.
    fn apply_plan(&mut self, jobs: &[TaskId], plan: &DispatchPlan) -> SimResult<()> {
        let now = self.now;
        let mut order: Vec<(bool, (SimTime, TaskId))> = Vec::with_capacity(jobs.len());
        for &id in jobs {
            let task = self.entities.task(id)?;
            let key = match plan.get(id) {
                Some(p) if !task.is_derived() => (p.start, id),
                _ => task.staging_key(),
            };
            order.push((!task.is_derived(), key));
        }
        order.sort();

        let mut fleet = LocalFleet::new(now, self.entities.tugs());
        for (_, (_, id)) in order {
            match self.checked_crew(id, plan)? {
                Some((tugs, proposed)) => self.time_staffed(id, tugs, proposed, &mut fleet)?,
                None => self.time_unstaffed(id, &mut fleet)?,
            }
        }
        Ok(())
    }

    /// The proposal for `id` if it can be timed this round.
    fn checked_crew(&self, id: TaskId, plan: &DispatchPlan) -> SimResult<Option<(Vec<TugId>, SimTime)>> {
        let task = self.entities.task(id)?;
        let Some(p) = plan.get(id) else {
            return Ok(None);
        };
        if p.tugs.is_empty() || p.tugs.len() != task.required.len() {
            return Ok(None);
        }
        for (i, &tug) in p.tugs.iter().enumerate() {
            if p.tugs[..i].contains(&tug) {
                return Err(InvariantViolation::DuplicateTug { task: id, tug }.into());
            }
            let t = self.entities.tug(tug)?;
            if self.entities.release_unsettled(t, task) {
                return Ok(None);
            }
        }
        if let Some(parent) = id.parent() {
            let parent = self.entities.task(parent)?;
            if let Some(&tug) = p.tugs.iter().find(|t| parent.tugs.contains(t)) {
                return Err(InvariantViolation::SharedWithParent { task: id, tug }.into());
            }
        }
        Ok(Some((p.tugs.clone(), p.start)))
    }

    fn time_staffed(
        &mut self,
        id:       TaskId,
        tugs:     Vec<TugId>,
        proposed: SimTime,
        fleet:    &mut LocalFleet,
    ) -> SimResult<()> {
        let now = self.now;
        if let Some(&tug) = tugs.iter().find(|&&t| !fleet.contains(t)) {
            return Err(InvariantViolation::UnknownTug(tug).into());
        }
        let task = self.entities.task(id)?;
        let origin = task.origin;
        let scheduled = task.scheduled_start;
        let end_point = self.services.position_of(task.destination);
        let floor = if task.is_derived() { now.max(scheduled) } else { now };
        let ready = fleet
            .earliest_start(&tugs, origin, floor, &self.services)
            .ok_or(InvariantViolation::UnknownTask(id))?;
        let realized = scheduled.max(proposed).max(ready);

        let work = match id.parent() {
            Some(parent) => self.fold_extra_wait(parent, scheduled, realized - scheduled, fleet)?,
            None => {
                let crew = tugs
                    .iter()
                    .map(|&t| self.entities.tug(t))
                    .collect::<Result<Vec<&Tug>, InvariantViolation>>()?;
                self.services.predict_work(self.entities.task(id)?, &crew)?
            }
        };
        let confirm_at = tugs
            .iter()
            .map(|&t| realized - fleet.travel(t, origin, &self.services).unwrap_or(0))
            .fold(now, SimTime::max);
        fleet.book(&tugs, end_point, realized + work);

        let task = self.entities.task_mut(id)?;
        task.tugs = tugs;
        task.realized_start = realized;
        task.work_time = work;
        retime(&mut self.queue, task, Milestone::Confirm, confirm_at);
        retime(&mut self.queue, task, Milestone::Start, realized);
        Ok(())
    }

    fn time_unstaffed(&mut self, id: TaskId, fleet: &mut LocalFleet) -> SimResult<()> {
        let now = self.now;
        let task = self.entities.task_mut(id)?;
        task.tugs.clear();
        task.realized_start = task.realized_start.max(now);
        let realized = task.realized_start;
        let scheduled = task.scheduled_start;
        retime(&mut self.queue, task, Milestone::Confirm, realized);
        retime(&mut self.queue, task, Milestone::Start, realized);
        if let Some(parent) = id.parent() {
            self.fold_extra_wait(parent, scheduled, 0, fleet)?;
        }
        Ok(())
    }

    /// Stretch `parent` by `extra`, the wait of its derived job scheduled
    /// at `scheduled`.
    ///
    /// Idempotent: the parent carries the extension already applied, and
    /// only the difference moves its end and its tugs.  Returns the derived
    /// job's work time, which ends with the parent's unextended work.
    fn fold_extra_wait(
        &mut self,
        parent:    TaskId,
        scheduled: SimTime,
        extra:     Minutes,
        fleet:     &mut LocalFleet,
    ) -> SimResult<Minutes> {
        let extra = extra.max(0);
        let p = self.entities.task_mut(parent)?;
        let work = (p.base_end_time() - scheduled).max(0);
        let delta = extra - p.extra_wait;
        if delta == 0 {
            return Ok(work);
        }
        p.extra_wait = extra;
        p.work_time += delta;
        let end = p.end_time();
        let tugs = p.tugs.clone();
        if let Some(ev) = p.end_event {
            self.queue.reschedule(ev, end);
        }
        for t in tugs {
            let tug = self.entities.tug_mut(t)?;
            tug.next_available += delta;
            fleet.book(&[t], tug.position, tug.next_available);
        }
        Ok(work)
    }

    // ── Stall guard ───────────────────────────────────────────────────────

    /// Wake the scheduler if a job without a full tentative crew would
    /// otherwise wait for a far-off Confirm with nothing in between that
    /// re-runs the policy.  Jobs already crewed just wait for their Confirm.
    fn stall_guard<O: SimObserver>(&mut self, observer: &mut O) {
        let unstaffed = |id: TaskId| {
            self.entities.get_task(id).is_some_and(|t| {
                t.state == TaskState::UnprocessedUnassigned && t.tugs.len() != t.required.len()
            })
        };
        if !self.visible.iter().any(|&id| unstaffed(id)) {
            return;
        }
        let mut wake = None;
        for ev in self.queue.iter() {
            if ev.kind.triggers_dispatch() {
                break;
            }
            let far_confirm = ev.kind == EventKind::Confirm
                && ev.task.is_some_and(unstaffed)
                && ev.time - self.now > self.options.stall_gap;
            if far_confirm {
                wake = Some(self.now + self.options.routine_offset);
                break;
            }
        }
        if let Some(at) = wake {
            self.queue.push(None, at, EventKind::Routine);
            self.stats.stall_guards += 1;
            observer.on_stall_guard(self.now, at);
        }
    }
}
