//! `tug-event` — the event model of the tug dispatch simulator.
//!
//! # Ordering
//!
//! Events are popped by `(time, priority, sequence)`.  Among events at the
//! same minute the fixed precedence is:
//!
//! ```text
//! EndWork > WorkDelay > Cancel > StartDelay > RequirementChange
//!         > Confirm > StartWork > TemporaryNeed > Routine
//! ```
//!
//! and insertion order breaks the remaining ties, so a run is a pure
//! function of its inputs and seed.
//!
//! # Handlers
//!
//! [`handle`] applies one event to the [`EntityPool`][tug_model::EntityPool]
//! and reports whether the dispatch policy must run again.  Broken
//! invariants come back as [`InvariantViolation`][tug_model::InvariantViolation]
//! and end the run.

pub mod event;
pub mod handlers;
pub mod queue;


pub use event::{Event, EventKind};
pub use handlers::{HandlerContext, Outcome, handle};
pub use queue::EventQueue;
