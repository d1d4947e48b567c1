//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

use crate::{PierId, TaskId};

/// The error type for `tug-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported tug count {count}: the weight bracket table covers 1 or 2 tugs")]
    UnsupportedTugCount { count: usize },

    #[error("unknown capability class code {0}")]
    UnknownClass(u16),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("pier {0} not found")]
    PierNotFound(PierId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `tug-core`.
pub type CoreResult<T> = Result<T, CoreError>;
