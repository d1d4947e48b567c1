//! `tug-model` — the shared mutable data the simulator operates on.
//!
//! Tugs and tasks live together in one [`EntityPool`] arena and refer to each
//! other by id only.  Nothing in this crate keeps the two sides consistent;
//! that is the event handlers' and the scheduler's job.
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`kinds`]     | `Movement`, `Priority`, `TugState`, `TaskState`, `DutyShift` |
//! | [`tug`]       | `Tug`, `Stint` history entries                           |
//! | [`task`]      | `Task`, `Ship`, `TaskLedger`                             |
//! | [`pool`]      | `EntityPool` arena                                       |
//! | [`billing`]   | Revenue and waiting-penalty rules                        |
//! | [`loader`]    | CSV loaders for fleets and job schedules                 |
//! | [`error`]     | `ModelError`, `InvariantViolation`                       |

pub mod billing;
pub mod error;
pub mod kinds;
pub mod loader;
pub mod pool;
pub mod task;
pub mod tug;


pub use error::{InvariantViolation, ModelError, ModelResult};
pub use kinds::{DutyShift, Movement, Priority, TaskState, TugState};
pub use loader::{load_tasks_csv, load_tasks_reader, load_tugs_csv, load_tugs_reader};
pub use pool::EntityPool;
pub use task::{Ship, Task, TaskLedger};
pub use tug::{Stint, Tug};
