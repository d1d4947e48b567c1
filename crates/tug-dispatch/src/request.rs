//! Policy input and output.

use tug_core::{Minutes, SimTime, TaskId, TugId};
use tug_model::{EntityPool, Task, Tug};
use tug_port::PortServices;

/// A read-only snapshot handed to [`DispatchPolicy::dispatch`][crate::DispatchPolicy::dispatch].
///
/// Built by the scheduler once per policy invocation.  All borrows live for
/// the duration of that call; the scheduler never mutates the entities while
/// a request is alive.
pub struct DispatchRequest<'a> {
    pub now:            SimTime,
    /// Unassigned jobs, original and derived, sorted by `(scheduled start, id)`.
    pub jobs:           Vec<&'a Task>,
    /// The duty pool.
    pub pool:           Vec<&'a Tug>,
    /// The auxiliary fleet.  Empty when help is not configured.
    pub help:           Vec<&'a Tug>,
    /// Whether help tugs may be used in this invocation.
    pub allow_help:     bool,
    /// Help is only worth calling when the own fleet's best wait exceeds this.
    pub help_threshold: Minutes,
    pub entities:       &'a EntityPool,
    pub services:       &'a PortServices,
}

impl<'a> DispatchRequest<'a> {
    /// The job a derived job was spawned from.
    pub fn parent_of(&self, job: &Task) -> Option<&'a Task> {
        job.id.parent().and_then(|p| self.entities.get_task(p))
    }

    /// Tugs a job may not use.  For derived jobs: the parent's, and tugs
    /// busy on another parent whose release can still move this round
    /// ([`EntityPool::release_unsettled`]).
    pub fn excluded_for(&self, job: &Task) -> Vec<TugId> {
        let Some(parent) = self.parent_of(job) else {
            return Vec::new();
        };
        let mut out = parent.tugs.clone();
        out.extend(
            self.pool
                .iter()
                .chain(&self.help)
                .filter(|t| self.entities.release_unsettled(t, job))
                .map(|t| t.id),
        );
        out
    }

    /// Earliest time a tug may leave for `job`.  Derived jobs cannot start
    /// before they were announced.
    pub fn floor_for(&self, job: &Task) -> SimTime {
        if job.is_derived() { self.now.max(job.scheduled_start) } else { self.now }
    }

    /// Whether the help pool may be consulted for a job whose best own-fleet
    /// wait is `own_wait`.
    #[inline]
    pub fn wants_help(&self, own_wait: Minutes) -> bool {
        self.allow_help && !self.help.is_empty() && own_wait > self.help_threshold
    }
}

/// A tentative assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub task:  TaskId,
    /// Empty when the policy could not staff the job.
    pub tugs:  Vec<TugId>,
    /// Proposed start of work.
    pub start: SimTime,
}

impl Proposal {
    /// "No tugs this round."
    pub fn unassigned(task: &Task) -> Self {
        Self { task: task.id, tugs: Vec::new(), start: task.realized_start }
    }
}

/// What a policy returns: at most one proposal per offered job.
#[derive(Clone, Debug, Default)]
pub struct DispatchPlan {
    pub proposals: Vec<Proposal>,
}

impl DispatchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, proposal: Proposal) {
        self.proposals.push(proposal);
    }

    pub fn get(&self, task: TaskId) -> Option<&Proposal> {
        self.proposals.iter().find(|p| p.task == task)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Proposals that actually name tugs.
    pub fn assigned(&self) -> impl Iterator<Item = &Proposal> + '_ {
        self.proposals.iter().filter(|p| !p.tugs.is_empty())
    }
}
