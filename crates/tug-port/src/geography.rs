//! Pier positions, travel times, and fuel pricing.
//!
//! # Pier table format
//!
//! ```csv
//! pier_id,lat,lon
//! 0,22.6150,120.2650
//! 1,22.5560,120.3110
//! ```

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use tug_core::{GeoPoint, Minutes, PierId};

use crate::{PortError, PortResult};

const KM_PER_NAUTICAL_MILE: f64 = 1.852;

/// Sailing time in whole minutes (rounded up) for `km` at `knots`.
pub fn travel_minutes(km: f64, knots: f64) -> Minutes {
    if km <= 0.0 || knots <= 0.0 {
        return 0;
    }
    (km / KM_PER_NAUTICAL_MILE / knots * 60.0).ceil() as Minutes
}

// ── Trait ─────────────────────────────────────────────────────────────────────

/// Harbour geography and pricing.
///
/// # Contract
///
/// - Pure and deterministic: the same inputs always give the same answer.
/// - No failure modes: unknown piers resolve to some fixed position.
pub trait Geography: Send + Sync {
    /// Position of a pier.
    fn position_of(&self, pier: PierId) -> GeoPoint;

    /// Fuel cost per kilometre sailed by a tug of `horsepower`.
    fn fuel_cost_per_km(&self, horsepower: u32) -> f64;

    /// Sailing distance from `from` to `to`.
    fn distance_km(&self, from: GeoPoint, to: PierId) -> f64 {
        from.distance_km(self.position_of(to))
    }

    /// Sailing time from `from` to `to` at `knots`.
    fn travel_time(&self, from: GeoPoint, to: PierId, knots: f64) -> Minutes {
        travel_minutes(self.distance_km(from, to), knots)
    }
}

// ── PierMap ───────────────────────────────────────────────────────────────────

/// Fuel cost per kilometre by engine horsepower, measured on the harbour fleet.
const FUEL_TABLE: [(u32, f64); 13] = [
    (1_800, 134.11),
    (2_400, 185.07),
    (3_200, 257.89),
    (3_300, 267.38),
    (3_400, 276.96),
    (3_500, 286.63),
    (3_600, 296.38),
    (4_000, 336.27),
    (4_200, 356.73),
    (4_400, 377.55),
    (4_500, 388.08),
    (5_200, 464.28),
    (6_400, 604.80),
];

/// Table-backed [`Geography`].
///
/// Unknown piers resolve to `fallback` (the anchorage).  Horsepower values
/// between table rows are interpolated linearly; values outside the table
/// scale the nearest row proportionally.
#[derive(Clone, Debug)]
pub struct PierMap {
    piers:    HashMap<PierId, GeoPoint>,
    fallback: GeoPoint,
    fuel:     Vec<(u32, f64)>,
}

impl PierMap {
    pub fn new(piers: impl IntoIterator<Item = (PierId, GeoPoint)>, fallback: GeoPoint) -> Self {
        Self {
            piers: piers.into_iter().collect(),
            fallback,
            fuel: FUEL_TABLE.to_vec(),
        }
    }

    /// Replace the horsepower → cost-per-km table.  Rows are sorted by
    /// horsepower; an empty table keeps the built-in one.
    pub fn with_fuel_table(mut self, mut table: Vec<(u32, f64)>) -> Self {
        if !table.is_empty() {
            table.sort_by_key(|&(hp, _)| hp);
            self.fuel = table;
        }
        self
    }

    pub fn pier_count(&self) -> usize {
        self.piers.len()
    }
}

impl Geography for PierMap {
    fn position_of(&self, pier: PierId) -> GeoPoint {
        self.piers.get(&pier).copied().unwrap_or(self.fallback)
    }

    fn fuel_cost_per_km(&self, horsepower: u32) -> f64 {
        let (Some(&(lo_hp, lo_cost)), Some(&(hi_hp, hi_cost))) = (self.fuel.first(), self.fuel.last()) else {
            return 0.0;
        };
        if horsepower <= lo_hp {
            return lo_cost * horsepower as f64 / lo_hp as f64;
        }
        if horsepower >= hi_hp {
            return hi_cost * horsepower as f64 / hi_hp as f64;
        }
        let upper = self.fuel.partition_point(|&(hp, _)| hp < horsepower);
        let (hp1, c1) = self.fuel[upper];
        if hp1 == horsepower {
            return c1;
        }
        let (hp0, c0) = self.fuel[upper - 1];
        let f = (horsepower - hp0) as f64 / (hp1 - hp0) as f64;
        c0 + f * (c1 - c0)
    }
}

// ── Loader ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PierRecord {
    pier_id: u32,
    lat:     f64,
    lon:     f64,
}

/// Load a [`PierMap`] from a CSV file.
pub fn load_piers_csv(path: &Path, fallback: GeoPoint) -> PortResult<PierMap> {
    let file = std::fs::File::open(path).map_err(PortError::Io)?;
    load_piers_reader(file, fallback)
}

/// Like [`load_piers_csv`] but accepts any `Read` source.
pub fn load_piers_reader<R: Read>(reader: R, fallback: GeoPoint) -> PortResult<PierMap> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut piers = Vec::new();
    for result in csv_reader.deserialize::<PierRecord>() {
        let row = result.map_err(|e| PortError::Parse(e.to_string()))?;
        piers.push((PierId(row.pier_id), GeoPoint::new(row.lat, row.lon)));
    }
    Ok(PierMap::new(piers, fallback))
}
