use thiserror::Error;
use tug_core::{CoreError, TaskId};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("cannot predict work time for {task} with no tugs")]
    EmptyTugSet { task: TaskId },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("pier table parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PortResult<T> = Result<T, PortError>;
