//! `tug-port` — services the simulator consults but does not own.
//!
//! Both services are traits so that real data sources (a GIS lookup, a
//! trained regression model) can be plugged in without touching the core.
//! The crate ships deterministic reference implementations:
//!
//! | Trait                 | Reference impl                                   |
//! |-----------------------|--------------------------------------------------|
//! | [`Geography`]         | [`PierMap`] — pier table + horsepower fuel table |
//! | [`DurationPredictor`] | [`LinearPredictor`], [`FixedPredictor`]          |
//!
//! [`PortServices`] bundles one of each with the tug cruising speed and is
//! passed explicitly to the scheduler and to dispatch policies.

pub mod error;
pub mod geography;
pub mod predictor;
pub mod services;


pub use error::{PortError, PortResult};
pub use geography::{Geography, PierMap, load_piers_csv, load_piers_reader, travel_minutes};
pub use predictor::{DurationPredictor, FixedPredictor, JobProfile, LinearPredictor, TugProfile};
pub use services::PortServices;
