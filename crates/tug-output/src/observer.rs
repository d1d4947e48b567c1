//! `EventLogObserver<W>` — bridges `SimObserver` to an `OutputWriter`.

use tug_core::{SimTime, TaskId};
use tug_event::{Event, Outcome};
use tug_model::EntityPool;
use tug_sim::{RunResult, SimObserver};

use crate::row::{EventRow, SummaryRow, TaskRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that logs every applied event and, at the end of the
/// run, the job outcomes and run totals to any [`OutputWriter`].
///
/// Errors from the writer are stored internally because `SimObserver`
/// methods have no return value.  After `sim.run()` returns, check for
/// errors with [`take_error`][Self::take_error].
pub struct EventLogObserver<W: OutputWriter> {
    writer:     W,
    rows:       u64,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> EventLogObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, rows: 0, last_error: None }
    }

    /// Take the stored write error (if any) after `sim.run()` returns.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Event log rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Unwrap the inner writer (e.g. to inspect files after the sim).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn log(&mut self, row: EventRow) {
        let result = self.writer.write_events(std::slice::from_ref(&row));
        if result.is_ok() {
            self.rows += 1;
        }
        self.store_err(result);
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimObserver for EventLogObserver<W> {
    fn on_event(&mut self, event: &Event, outcome: Outcome, _entities: &EntityPool) {
        self.log(EventRow::new(event, outcome));
    }

    fn on_deferral(&mut self, now: SimTime, task: TaskId, attempt: u32) {
        self.log(EventRow {
            time:    now.0,
            task:    Some(task.0),
            kind:    "confirm",
            detail:  attempt.to_string(),
            outcome: "deferred",
        });
    }

    fn on_sim_end(&mut self, result: &RunResult) {
        let rows: Vec<TaskRow> = result.tasks.iter().map(TaskRow::from).collect();
        let written = self.writer.write_tasks(&rows);
        self.store_err(written);
        let written = self.writer.write_summary(&SummaryRow::from(result));
        self.store_err(written);
        let finished = self.writer.finish();
        self.store_err(finished);
    }
}
