//! `tug-sim` — discrete-event scheduler loop for the tug dispatch simulator.
//!
//! # Event loop
//!
//! ```text
//! loop:
//!   next_admit = backlog.front().scheduled_start − window
//!   next_event = queue.peek_time()
//!   ① Admit     — if next_admit ≤ next_event: queue Confirm + StartWork for
//!                 every job inside the window, plus the perturbation
//!                 model's announcements; refresh the duty pool; dispatch.
//!   ② Event     — otherwise pop one event:
//!                   job finished            → skip
//!                   Confirm, job unstaffed  → defer by retry_interval
//!                   otherwise               → handler, then follow-ups
//!                 and dispatch again if the event calls for it.
//!   ③ Dispatch  — policy proposes; proposals are checked against travel
//!                 and availability; Confirm/StartWork are re-timed.
//!   ④ Guard     — an unstaffed job waiting on a far Confirm with no
//!                 dispatch trigger in between gets a Routine wake-up.
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                     |
//! |------------|------------------------------------------------------------|
//! | `parallel` | [`run_replications`] runs seeds on Rayon's thread pool.    |
//! | `serde`    | Serialize/deserialize options, outcomes and run totals.    |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use tug_dispatch::GreedyProfit;
//! use tug_sim::{NoopObserver, SimBuilder, SimOptions, StochasticPerturbation};
//!
//! let mut sim = SimBuilder::new(SimOptions::default(), tasks, tugs, GreedyProfit::default(), services)
//!     .perturbation(StochasticPerturbation::default())
//!     .build()?;
//! let result = sim.run(&mut NoopObserver)?;
//! println!("profit {:.0}", result.profit);
//! ```

pub mod builder;
pub mod error;
pub mod observer;
pub mod options;
pub mod outcome;
pub mod perturbation;
pub mod replication;
pub mod roster;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::{ScriptedEvent, SimBuilder};
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver};
pub use options::{HelpConfig, SimOptions};
pub use outcome::{CompanyTotals, MatchCounts, RunResult, RunStats, TaskOutcome};
pub use perturbation::{
    ChainedPerturbation, NoPerturbation, PerturbationConfig, PerturbationExt, PerturbationModel,
    StochasticPerturbation,
};
pub use replication::{ReplicationSummary, run_replications};
pub use roster::DutyRoster;
pub use sim::Simulator;
