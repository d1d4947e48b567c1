//! Simulation observer trait for progress reporting and data collection.

use tug_core::{SimTime, TaskId, TugId};
use tug_dispatch::DispatchPlan;
use tug_event::{Event, Outcome};
use tug_model::{EntityPool, Task};

use crate::RunResult;

/// Callbacks invoked by [`Simulator::run`][crate::Simulator::run] at key
/// points of the event loop.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example — event printer
///
/// ```rust,ignore
/// struct Printer;
///
/// impl SimObserver for Printer {
///     fn on_event(&mut self, event: &Event, outcome: Outcome, _: &EntityPool) {
///         println!("{} {:?} {} -> {outcome:?}", event.time, event.task, event.kind);
///     }
/// }
/// ```
pub trait SimObserver {
    /// A job entered the dispatch window.
    fn on_admit(&mut self, _now: SimTime, _task: &Task) {}

    /// The duty pool changed.
    fn on_pool(&mut self, _now: SimTime, _pool: &[TugId]) {}

    /// A dispatch round finished.  `help_failed` is set when the help fleet
    /// did not answer and the plan was made with the own fleet only.
    fn on_dispatch(&mut self, _now: SimTime, _plan: &DispatchPlan, _help_failed: bool) {}

    /// An event was applied.  Deferred Confirms and events of finished jobs
    /// are not reported here.
    fn on_event(&mut self, _event: &Event, _outcome: Outcome, _entities: &EntityPool) {}

    /// A Confirm found its job unstaffed and was pushed back.
    fn on_deferral(&mut self, _now: SimTime, _task: TaskId, _attempt: u32) {}

    /// The stall guard queued a Routine event.
    fn on_stall_guard(&mut self, _now: SimTime, _wake_at: SimTime) {}

    /// Called once after the last event.
    fn on_sim_end(&mut self, _result: &RunResult) {}
}

/// A [`SimObserver`] that does nothing.  Use when you need to call `run` but
/// don't want progress callbacks.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
