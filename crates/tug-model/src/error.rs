//! Error types for tug-model.

use thiserror::Error;
use tug_core::{CoreError, SimTime, TaskId, TugId};

use crate::{TaskState, TugState};

/// A broken scheduler or policy invariant.  Always fatal for the run.
///
/// Every variant carries the ids and the expected/actual values needed to
/// reproduce the failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("{task}: expected state {expected}, found {actual}")]
    WrongTaskState {
        task:     TaskId,
        expected: &'static str,
        actual:   TaskState,
    },

    #[error("{task}: {required} required classes but {assigned} tugs assigned")]
    CountMismatch {
        task:     TaskId,
        required: usize,
        assigned: usize,
    },

    #[error("{task}: {tug} must be free to confirm, found {state:?}")]
    TugNotFree {
        task:  TaskId,
        tug:   TugId,
        state: TugState,
    },

    #[error("{task}: confirmed at {at}, before its start {scheduled}")]
    ConfirmBeforeStart {
        task:      TaskId,
        at:        SimTime,
        scheduled: SimTime,
    },

    #[error("{task}: {tug} available at {actual}, expected {expected}")]
    AvailabilityMismatch {
        task:     TaskId,
        tug:      TugId,
        expected: SimTime,
        actual:   SimTime,
    },

    #[error("{task}: {tug} has no open stint for this task")]
    NoOpenStint { task: TaskId, tug: TugId },

    #[error("{task}: {tug} is already serving the parent job")]
    SharedWithParent { task: TaskId, tug: TugId },

    #[error("{task}: {tug} assigned twice")]
    DuplicateTug { task: TaskId, tug: TugId },

    #[error("{0} is not in the entity pool")]
    UnknownTask(TaskId),

    #[error("{0} is not in the entity pool")]
    UnknownTug(TugId),
}

/// Errors raised while building or loading entities.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("duplicate {what} id {id}")]
    DuplicateId { what: &'static str, id: i64 },

    #[error("model parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;
