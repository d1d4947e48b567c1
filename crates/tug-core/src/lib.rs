//! `tug-core` — foundational types for the tug dispatch simulator.
//!
//! This crate is a dependency of every other `tug-*` crate.  It has no
//! `tug-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module           | Contents                                              |
//! |------------------|-------------------------------------------------------|
//! | [`ids`]          | `TugId`, `TaskId`, `PierId`, `ShipId`, `EventId`, …   |
//! | [`geo`]          | `GeoPoint`, haversine distance in kilometres          |
//! | [`time`]         | `SimTime` (whole minutes), day/shift helpers          |
//! | [`capability`]   | `CapabilityClass`, coverage law, weight brackets      |
//! | [`rng`]          | `TaskRng` (per-job streams), `SimRng` (global)        |
//! | [`error`]        | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod capability;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use capability::{
    CapabilityClass, MatchGrade, covers, format_class_list, parse_class_list, required_classes,
    wind_level,
};
pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{CompanyId, EventId, PierId, ShipId, TaskId, TugId};
pub use rng::{SimRng, TaskRng};
pub use time::{MINUTES_PER_DAY, Minutes, SimTime};
