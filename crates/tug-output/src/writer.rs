//! The `OutputWriter` trait implemented by backend writers.

use crate::{EventRow, OutputResult, SummaryRow, TaskRow};

/// A sink for the three record kinds a run produces.
///
/// Errors are returned to the caller; [`EventLogObserver`][crate::EventLogObserver]
/// keeps the first one for [`take_error`][crate::EventLogObserver::take_error].
pub trait OutputWriter {
    /// Append event log rows.
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()>;

    /// Write the per-job outcome rows.
    fn write_tasks(&mut self, rows: &[TaskRow]) -> OutputResult<()>;

    fn write_summary(&mut self, row: &SummaryRow) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent: safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
