//! One handler per [`EventKind`].
//!
//! Handlers own all tug ↔ task bookkeeping triggered by an event: they
//! update both sides of the relation through the [`EntityPool`] and leave
//! follow-up scheduling (spawning successor events, re-timing, derived
//! jobs) to the caller.

use tug_core::{CapabilityClass, Minutes, SimTime, TaskId, TugId};
use tug_model::{EntityPool, InvariantViolation, TaskState, Tug};
use tug_port::PortServices;

use crate::{Event, EventKind};

/// What the caller must do after a handler ran.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// State changed; no new dispatch needed.
    Applied,
    /// State changed and the dispatch policy must run again.
    Redispatch,
    /// The event no longer applies (terminal task, wrong phase); nothing
    /// changed.
    Ignored,
}

/// Services and thresholds the handlers need.
pub struct HandlerContext<'a> {
    pub services:              &'a PortServices,
    /// Start delays longer than this release the job's tugs.
    pub start_delay_tolerance: Minutes,
}

/// Apply `event` to `entities`.
pub fn handle(
    entities: &mut EntityPool,
    event:    &Event,
    ctx:      &HandlerContext<'_>,
) -> Result<Outcome, InvariantViolation> {
    let Some(task) = event.task else {
        // Only Routine events are task-less.
        return Ok(Outcome::Redispatch);
    };
    let at = event.time;
    match &event.kind {
        EventKind::Confirm => confirm(entities, task, at, ctx.services),
        EventKind::RequirementChange { required } => change_requirement(entities, task, at, required),
        EventKind::Cancel => cancel(entities, task, at, ctx.services),
        EventKind::StartDelay { delay } => {
            start_delay(entities, task, at, *delay, ctx.start_delay_tolerance)
        }
        EventKind::WorkDelay { delay } => work_delay(entities, task, at, *delay),
        EventKind::TemporaryNeed { extra } => temporary_need(entities, task, at, extra),
        EventKind::StartWork => start_work(entities, task),
        EventKind::EndWork => end_work(entities, task, at),
        EventKind::Routine => Ok(Outcome::Redispatch),
    }
}

// ── Confirm ───────────────────────────────────────────────────────────────────

/// Commit the tentatively assigned tugs to `id`.
pub fn confirm(
    entities: &mut EntityPool,
    id:       TaskId,
    at:       SimTime,
    services: &PortServices,
) -> Result<Outcome, InvariantViolation> {
    let task = entities.task(id)?;
    expect_state(id, task.state, TaskState::UnprocessedUnassigned)?;
    if task.tugs.len() != task.required.len() {
        return Err(InvariantViolation::CountMismatch {
            task:     id,
            required: task.required.len(),
            assigned: task.tugs.len(),
        });
    }
    if task.is_derived() && at < task.scheduled_start {
        return Err(InvariantViolation::ConfirmBeforeStart {
            task:      id,
            at,
            scheduled: task.scheduled_start,
        });
    }
    for (i, &tug_id) in task.tugs.iter().enumerate() {
        if task.tugs[..i].contains(&tug_id) {
            return Err(InvariantViolation::DuplicateTug { task: id, tug: tug_id });
        }
        let tug = entities.tug(tug_id)?;
        if !tug.is_free() {
            return Err(InvariantViolation::TugNotFree { task: id, tug: tug_id, state: tug.state });
        }
    }

    let tug_ids = task.tugs.clone();
    let origin = task.origin;
    let realized = task.realized_start;
    let end = task.end_time();
    let end_point = services.position_of(task.destination);

    let mut departures = Vec::with_capacity(tug_ids.len());
    let mut moving_cost = 0.0;
    let mut moving_minutes = 0;
    for &tug_id in &tug_ids {
        let tug = entities.tug_mut(tug_id)?;
        let from = tug.position;
        let travel = services.travel_time(from, origin);
        moving_cost += services.moving_cost(tug, from, origin);
        moving_minutes += travel;
        let depart = realized - travel;
        tug.engage(id, depart, realized, end, end_point);
        departures.push((tug_id, depart));
    }

    let task = entities.task_mut(id)?;
    task.state = TaskState::UnprocessedAssigned;
    task.departures = departures;
    task.ledger.moving_cost = moving_cost;
    task.ledger.moving_minutes = moving_minutes;
    Ok(Outcome::Applied)
}

// ── Requirement change ────────────────────────────────────────────────────────

pub fn change_requirement(
    entities: &mut EntityPool,
    id:       TaskId,
    at:       SimTime,
    required: &[CapabilityClass],
) -> Result<Outcome, InvariantViolation> {
    let task = entities.task_mut(id)?;
    if task.state.is_terminal() {
        return Ok(Outcome::Ignored);
    }
    task.required = required.to_vec();
    if task.state == TaskState::UnprocessedAssigned {
        unassign(entities, id, at)?;
    }
    Ok(Outcome::Redispatch)
}

// ── Cancel ────────────────────────────────────────────────────────────────────

pub fn cancel(
    entities: &mut EntityPool,
    id:       TaskId,
    at:       SimTime,
    services: &PortServices,
) -> Result<Outcome, InvariantViolation> {
    let task = entities.task(id)?;
    if task.state.is_terminal() {
        return Ok(Outcome::Ignored);
    }
    if task.state.holds_tugs() {
        let pinned = services.position_of(task.origin);
        for tug_id in task.tugs.clone() {
            let tug = entities.tug_mut(tug_id)?;
            close_stint(tug, id, at)?;
            tug.position = pinned;
            tug.next_available = at;
        }
    }
    let task = entities.task_mut(id)?;
    task.state = TaskState::Canceled;
    task.work_time = (at - task.realized_start).max(0);
    Ok(Outcome::Redispatch)
}

// ── Start delay ───────────────────────────────────────────────────────────────

pub fn start_delay(
    entities:  &mut EntityPool,
    id:        TaskId,
    at:        SimTime,
    delay:     Minutes,
    tolerance: Minutes,
) -> Result<Outcome, InvariantViolation> {
    let task = entities.task_mut(id)?;
    if task.state.is_terminal() || task.state == TaskState::ProcessingAssigned {
        return Ok(Outcome::Ignored);
    }
    task.scheduled_start += delay;
    let realized = task.scheduled_start.max(task.realized_start);
    let shift = realized - task.realized_start;

    if task.state == TaskState::UnprocessedAssigned {
        if delay > tolerance {
            unassign(entities, id, at)?;
        } else {
            for tug_id in task.tugs.clone() {
                let tug = entities.tug_mut(tug_id)?;
                let stint = tug
                    .open_stint_mut(id)
                    .ok_or(InvariantViolation::NoOpenStint { task: id, tug: tug_id })?;
                stint.work_start = realized;
                tug.next_available += shift;
            }
        }
    }
    entities.task_mut(id)?.realized_start = realized;
    Ok(Outcome::Redispatch)
}

// ── Work delay ────────────────────────────────────────────────────────────────

/// Extend (or shorten) the work window.  Work never ends before the delay
/// is announced.
pub fn work_delay(
    entities: &mut EntityPool,
    id:       TaskId,
    at:       SimTime,
    delay:    Minutes,
) -> Result<Outcome, InvariantViolation> {
    let task = entities.task_mut(id)?;
    if task.state != TaskState::ProcessingAssigned {
        return Ok(Outcome::Ignored);
    }
    let applied = delay.max(at - task.end_time());
    task.work_time += applied;
    for tug_id in task.tugs.clone() {
        entities.tug_mut(tug_id)?.next_available += applied;
    }
    Ok(Outcome::Redispatch)
}

// ── Temporary need ────────────────────────────────────────────────────────────

/// Record an extra requirement for a job in progress.  The scheduler turns
/// it into a derived job.  A job takes at most one temporary need.
pub fn temporary_need(
    entities: &mut EntityPool,
    id:       TaskId,
    at:       SimTime,
    extra:    &[CapabilityClass],
) -> Result<Outcome, InvariantViolation> {
    let task = entities.task_mut(id)?;
    if task.state != TaskState::ProcessingAssigned
        || task.temp_need_at.is_some()
        || task.is_derived()
        || extra.is_empty()
    {
        return Ok(Outcome::Ignored);
    }
    task.temp_need_at = Some(at);
    task.required.extend_from_slice(extra);
    Ok(Outcome::Redispatch)
}

// ── Start / end of work ───────────────────────────────────────────────────────

pub fn start_work(entities: &mut EntityPool, id: TaskId) -> Result<Outcome, InvariantViolation> {
    let task = entities.task_mut(id)?;
    expect_state(id, task.state, TaskState::UnprocessedAssigned)?;
    task.state = TaskState::ProcessingAssigned;
    Ok(Outcome::Applied)
}

pub fn end_work(entities: &mut EntityPool, id: TaskId, at: SimTime) -> Result<Outcome, InvariantViolation> {
    let task = entities.task(id)?;
    expect_state(id, task.state, TaskState::ProcessingAssigned)?;
    let tug_ids = task.tugs.clone();
    for &tug_id in &tug_ids {
        let tug = entities.tug(tug_id)?;
        if tug.next_available != at {
            return Err(InvariantViolation::AvailabilityMismatch {
                task:     id,
                tug:      tug_id,
                expected: at,
                actual:   tug.next_available,
            });
        }
    }
    for &tug_id in &tug_ids {
        close_stint(entities.tug_mut(tug_id)?, id, at)?;
    }
    entities.task_mut(id)?.state = TaskState::Processed;
    Ok(Outcome::Applied)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn expect_state(id: TaskId, actual: TaskState, expected: TaskState) -> Result<(), InvariantViolation> {
    if actual == expected {
        Ok(())
    } else {
        Err(InvariantViolation::WrongTaskState { task: id, expected: expected.as_str(), actual })
    }
}

/// Release every tug of a confirmed-but-unstarted job and revert the job to
/// unassigned.
fn unassign(entities: &mut EntityPool, id: TaskId, at: SimTime) -> Result<(), InvariantViolation> {
    let tug_ids: Vec<TugId> = entities.task(id)?.tugs.clone();
    for tug_id in tug_ids {
        entities.tug_mut(tug_id)?.disengage(id, at)?;
    }
    let task = entities.task_mut(id)?;
    task.state = TaskState::UnprocessedUnassigned;
    task.tugs.clear();
    task.departures.clear();
    task.ledger.moving_cost = 0.0;
    task.ledger.moving_minutes = 0;
    Ok(())
}

/// Close the open stint a tug holds for `id` or for the job derived from it.
fn close_stint(tug: &mut Tug, id: TaskId, at: SimTime) -> Result<(), InvariantViolation> {
    let owner = tug
        .history
        .last()
        .filter(|s| s.work_end.is_none())
        .map(|s| s.task)
        .filter(|&t| t == id || t == id.derived());
    match owner {
        Some(task) => tug.release(task, at),
        None => Err(InvariantViolation::NoOpenStint { task: id, tug: tug.id }),
    }
}
