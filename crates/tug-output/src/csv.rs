//! CSV output backend.
//!
//! Creates three files in the configured output directory:
//! - `task_outcomes.csv`
//! - `run_summary.csv`
//! - `event_log.csv`

use std::fs::{self, File};
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{EventRow, OutputResult, SummaryRow, TaskRow};

pub const TASK_HEADER: [&str; 21] = [
    "task_id",
    "ship_id",
    "movement",
    "state",
    "scheduled_start",
    "realized_start",
    "end",
    "required",
    "assigned",
    "tugs",
    "company",
    "temporary_need",
    "moving_cost",
    "moving_minutes",
    "waiting_minutes",
    "waiting_cost",
    "revenue",
    "profit",
    "exact",
    "over",
    "under",
];

pub const SUMMARY_HEADER: [&str; 17] = [
    "policy",
    "seed",
    "completed",
    "canceled",
    "revenue",
    "moving_cost",
    "moving_minutes",
    "waiting_cost",
    "waiting_minutes",
    "profit",
    "exact_ratio",
    "over_ratio",
    "under_ratio",
    "events",
    "dispatch_rounds",
    "help_failures",
    "deferrals",
];

pub const EVENT_HEADER: [&str; 5] = ["time", "task_id", "kind", "detail", "outcome"];

/// Writes simulation output to three CSV files.
pub struct CsvWriter {
    tasks:    Writer<File>,
    summary:  Writer<File>,
    events:   Writer<File>,
    finished: bool,
}

impl CsvWriter {
    /// Create `dir` if needed, open the three CSV files in it and write the
    /// header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;

        let mut tasks = Writer::from_path(dir.join("task_outcomes.csv"))?;
        tasks.write_record(TASK_HEADER)?;

        let mut summary = Writer::from_path(dir.join("run_summary.csv"))?;
        summary.write_record(SUMMARY_HEADER)?;

        let mut events = Writer::from_path(dir.join("event_log.csv"))?;
        events.write_record(EVENT_HEADER)?;

        Ok(Self { tasks, summary, events, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()> {
        for row in rows {
            self.events.write_record(&[
                row.time.to_string(),
                row.task.map(|t| t.to_string()).unwrap_or_default(),
                row.kind.to_string(),
                row.detail.clone(),
                row.outcome.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_tasks(&mut self, rows: &[TaskRow]) -> OutputResult<()> {
        for row in rows {
            self.tasks.write_record(&[
                row.task_id.to_string(),
                row.ship_id.to_string(),
                row.movement.to_string(),
                row.state.to_string(),
                row.scheduled_start.to_string(),
                row.realized_start.to_string(),
                row.end.to_string(),
                row.required.clone(),
                row.assigned.clone(),
                row.tugs.clone(),
                row.company.clone(),
                (row.temporary_need as u8).to_string(),
                format!("{:.2}", row.moving_cost),
                row.moving_minutes.to_string(),
                row.waiting_minutes.to_string(),
                format!("{:.2}", row.waiting_cost),
                format!("{:.2}", row.revenue),
                format!("{:.2}", row.profit),
                row.exact.to_string(),
                row.over.to_string(),
                row.under.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_summary(&mut self, row: &SummaryRow) -> OutputResult<()> {
        self.summary.write_record(&[
            row.policy.clone(),
            row.seed.to_string(),
            row.completed.to_string(),
            row.canceled.to_string(),
            format!("{:.2}", row.revenue),
            format!("{:.2}", row.moving_cost),
            row.moving_minutes.to_string(),
            format!("{:.2}", row.waiting_cost),
            row.waiting_minutes.to_string(),
            format!("{:.2}", row.profit),
            format!("{:.4}", row.exact_ratio),
            format!("{:.4}", row.over_ratio),
            format!("{:.4}", row.under_ratio),
            row.events.to_string(),
            row.dispatch_rounds.to_string(),
            row.help_failures.to_string(),
            row.deferrals.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.tasks.flush()?;
        self.summary.flush()?;
        self.events.flush()?;
        Ok(())
    }
}
