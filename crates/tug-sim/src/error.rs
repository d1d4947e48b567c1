use thiserror::Error;
use tug_core::TaskId;
use tug_dispatch::DispatchError;
use tug_model::{InvariantViolation, ModelError};
use tug_port::PortError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("duration prediction failed: {0}")]
    Predictor(#[from] PortError),

    #[error("dispatch policy `{policy}` failed: {source}")]
    Dispatch {
        policy: String,
        #[source]
        source: DispatchError,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("{task} could not be staffed after {attempts} consecutive deferrals")]
    Starved { task: TaskId, attempts: u32 },
}

pub type SimResult<T> = Result<T, SimError>;
