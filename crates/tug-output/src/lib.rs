//! `tug-output` — simulation output writers for the tug dispatch simulator.
//!
//! | Writer        | Files created                                                |
//! |---------------|--------------------------------------------------------------|
//! | [`CsvWriter`] | `task_outcomes.csv`, `run_summary.csv`, `event_log.csv`      |
//!
//! Writers implement [`OutputWriter`] and are driven by
//! [`EventLogObserver`], which implements `tug_sim::SimObserver`: every
//! applied event becomes one log row while the run is going, and the job
//! outcomes and the summary are written when it ends.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tug_output::{CsvWriter, EventLogObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = EventLogObserver::new(writer);
//! sim.run(&mut obs)?;
//! if let Some(e) = obs.take_error() {
//!     eprintln!("output error: {e}");
//! }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;

#[cfg(test)]
mod tests;

pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::EventLogObserver;
pub use row::{EventRow, SummaryRow, TaskRow};
pub use writer::OutputWriter;
