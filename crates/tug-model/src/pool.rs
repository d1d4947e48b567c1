//! `EntityPool` — arena owning every tug and task of a run.
//!
//! Tasks name their tugs by [`TugId`] and tugs name their tasks by
//! [`TaskId`]; neither side owns the other.  Releasing a tug from a task is a
//! lookup plus field updates on both sides.

use std::collections::HashMap;

use tug_core::{TaskId, TugId};

use crate::{InvariantViolation, ModelError, ModelResult, Task, TaskState, Tug};

#[derive(Clone, Debug, Default)]
pub struct EntityPool {
    tugs:       Vec<Tug>,
    tasks:      Vec<Task>,
    tug_slots:  HashMap<TugId, usize>,
    task_slots: HashMap<TaskId, usize>,
}

impl EntityPool {
    /// Build a pool, rejecting duplicate ids.
    pub fn new(tugs: Vec<Tug>, tasks: Vec<Task>) -> ModelResult<Self> {
        let mut pool = Self::default();
        for tug in tugs {
            pool.insert_tug(tug)?;
        }
        for task in tasks {
            pool.insert_task(task)?;
        }
        Ok(pool)
    }

    pub fn insert_tug(&mut self, tug: Tug) -> ModelResult<()> {
        if self.tug_slots.contains_key(&tug.id) {
            return Err(ModelError::DuplicateId { what: "tug", id: tug.id.0 as i64 });
        }
        self.tug_slots.insert(tug.id, self.tugs.len());
        self.tugs.push(tug);
        Ok(())
    }

    pub fn insert_task(&mut self, task: Task) -> ModelResult<()> {
        if self.task_slots.contains_key(&task.id) {
            return Err(ModelError::DuplicateId { what: "task", id: task.id.0 as i64 });
        }
        self.task_slots.insert(task.id, self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    pub fn tug(&self, id: TugId) -> Result<&Tug, InvariantViolation> {
        self.tug_slots
            .get(&id)
            .map(|&i| &self.tugs[i])
            .ok_or(InvariantViolation::UnknownTug(id))
    }

    pub fn tug_mut(&mut self, id: TugId) -> Result<&mut Tug, InvariantViolation> {
        match self.tug_slots.get(&id) {
            Some(&i) => Ok(&mut self.tugs[i]),
            None => Err(InvariantViolation::UnknownTug(id)),
        }
    }

    pub fn task(&self, id: TaskId) -> Result<&Task, InvariantViolation> {
        self.get_task(id).ok_or(InvariantViolation::UnknownTask(id))
    }

    pub fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, InvariantViolation> {
        match self.task_slots.get(&id) {
            Some(&i) => Ok(&mut self.tasks[i]),
            None => Err(InvariantViolation::UnknownTask(id)),
        }
    }

    pub fn get_task(&self, id: TaskId) -> Option<&Task> {
        self.task_slots.get(&id).map(|&i| &self.tasks[i])
    }

    #[inline]
    pub fn contains_task(&self, id: TaskId) -> bool {
        self.task_slots.contains_key(&id)
    }

    /// All tugs in insertion order.
    pub fn tugs(&self) -> &[Tug] {
        &self.tugs
    }

    /// All tasks in insertion order (derived tasks after the jobs that
    /// spawned them).
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    // ── Temporary-need ordering ───────────────────────────────────────────

    /// Whether a derived `job` must not use `tug` because the tug's release
    /// time can still move before `job` is timed.
    ///
    /// That is the case when the tug is busy on another job whose own
    /// derived job is still unconfirmed and does not come before `job` in
    /// staging order ([`Task::staging_key`]).  Derived jobs staged earlier
    /// have already stretched their parents when `job` is timed.
    pub fn release_unsettled(&self, tug: &Tug, job: &Task) -> bool {
        if !job.is_derived() || tug.is_free() {
            return false;
        }
        let Some(&holder) = tug.tasks.last() else {
            return false;
        };
        if Some(holder) == job.id.parent() || holder.is_derived() {
            return false;
        }
        self.get_task(holder.derived())
            .filter(|d| d.state == TaskState::UnprocessedUnassigned)
            .is_some_and(|d| d.staging_key() >= job.staging_key())
    }
}
