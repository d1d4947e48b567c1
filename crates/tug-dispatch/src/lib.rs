//! `tug-dispatch` — who serves which job, and when.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                          |
//! |-------------|-------------------------------------------------------------------|
//! | [`request`] | `DispatchRequest<'a>` snapshot, `Proposal`, `DispatchPlan`        |
//! | [`policy`]  | `DispatchPolicy` trait and the reference policies                 |
//! | [`fleet`]   | `LocalFleet` — per-round tug positions and availability           |
//! | [`error`]   | `DispatchError`, `DispatchResult<T>`                              |
//!
//! # Design notes
//!
//! A policy is a pure function of its [`DispatchRequest`]: it sees the
//! pending jobs, the duty pool, the help pool and the port services, all
//! read-only, and answers with one [`Proposal`] per job.  Proposals are only
//! tentative.  The scheduler re-checks every proposal against travel times
//! and availability before it re-times the job's events, so a sloppy
//! policy can produce a poor plan but never an inconsistent one.
//!
//! Within a round, each policy books tugs on a [`LocalFleet`] so that a tug
//! given to an early job is only offered to later jobs after that job ends.

pub mod error;
pub mod fleet;
pub mod policy;
pub mod request;


pub use error::{DispatchError, DispatchResult};
pub use fleet::{LocalFleet, combinations};
pub use policy::{DispatchPolicy, GreedyProfit, NearestCapability, TimelineInsertion};
pub use request::{DispatchPlan, DispatchRequest, Proposal};
