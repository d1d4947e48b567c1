use thiserror::Error;
use tug_model::InvariantViolation;
use tug_port::PortError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("duration prediction failed: {0}")]
    Predictor(#[from] PortError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error("dispatch policy error: {0}")]
    Policy(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
