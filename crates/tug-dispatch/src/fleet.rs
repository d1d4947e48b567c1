//! `LocalFleet` — a round-local view of where each tug is and when it frees up.
//!
//! Policies and the scheduler's plan check both book tugs on a `LocalFleet`
//! as they walk the job list, so a tug given to an early job is offered to
//! later jobs only from that job's end, at that job's destination.

use std::collections::HashMap;

use tug_core::{CapabilityClass, GeoPoint, Minutes, PierId, SimTime, TugId};
use tug_model::Tug;
use tug_port::PortServices;

/// Candidate lists are cut to this many tugs before combinations are
/// enumerated.
pub const MAX_CANDIDATES: usize = 12;

/// One tug as seen by a dispatch round.
#[derive(Clone, Debug)]
pub struct FleetSlot {
    pub id:         TugId,
    pub class:      CapabilityClass,
    pub horsepower: u32,
    pub auxiliary:  bool,
    pub position:   GeoPoint,
    pub available:  SimTime,
}

#[derive(Clone, Debug, Default)]
pub struct LocalFleet {
    slots: Vec<FleetSlot>,
    index: HashMap<TugId, usize>,
}

impl LocalFleet {
    /// Snapshot `tugs`; none is available before `now`.
    pub fn new<'t>(now: SimTime, tugs: impl IntoIterator<Item = &'t Tug>) -> Self {
        let mut fleet = Self::default();
        for tug in tugs {
            if fleet.index.contains_key(&tug.id) {
                continue;
            }
            fleet.index.insert(tug.id, fleet.slots.len());
            fleet.slots.push(FleetSlot {
                id:         tug.id,
                class:      tug.class,
                horsepower: tug.horsepower,
                auxiliary:  tug.auxiliary,
                position:   tug.position,
                available:  tug.next_available.max(now),
            });
        }
        fleet
    }

    #[inline]
    pub fn get(&self, id: TugId) -> Option<&FleetSlot> {
        self.index.get(&id).map(|&i| &self.slots[i])
    }

    #[inline]
    pub fn contains(&self, id: TugId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn slots(&self) -> &[FleetSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sailing time from the tug's current position to `pier`.
    pub fn travel(&self, id: TugId, pier: PierId, services: &PortServices) -> Option<Minutes> {
        self.get(id).map(|s| services.travel_time(s.position, pier))
    }

    /// When the tug can be at `pier` if it leaves no earlier than `floor`.
    pub fn ready_at(
        &self,
        id:       TugId,
        pier:     PierId,
        floor:    SimTime,
        services: &PortServices,
    ) -> Option<SimTime> {
        self.get(id)
            .map(|s| s.available.max(floor) + services.travel_time(s.position, pier))
    }

    /// When every tug in `tugs` can be at `pier`.  `None` if any is unknown.
    pub fn earliest_start(
        &self,
        tugs:     &[TugId],
        pier:     PierId,
        floor:    SimTime,
        services: &PortServices,
    ) -> Option<SimTime> {
        tugs.iter().try_fold(floor, |latest, &id| {
            self.ready_at(id, pier, floor, services).map(|t| latest.max(t))
        })
    }

    /// Fuel cost of sailing the tug to `pier`.
    pub fn moving_cost(&self, id: TugId, pier: PierId, services: &PortServices) -> f64 {
        self.get(id).map_or(0.0, |s| {
            services.distance_km(s.position, pier) * services.geography.fuel_cost_per_km(s.horsepower)
        })
    }

    pub fn classes(&self, tugs: &[TugId]) -> Vec<CapabilityClass> {
        tugs.iter().filter_map(|&id| self.get(id).map(|s| s.class)).collect()
    }

    /// Tugs that may serve a job at `pier`, earliest-ready first (ties by id).
    ///
    /// Auxiliary tugs are listed only when `with_help` is set; tugs in
    /// `excluded` never are.
    pub fn ranked(
        &self,
        pier:      PierId,
        floor:     SimTime,
        excluded:  &[TugId],
        with_help: bool,
        services:  &PortServices,
    ) -> Vec<(TugId, SimTime)> {
        let mut out: Vec<(TugId, SimTime)> = self
            .slots
            .iter()
            .filter(|s| with_help || !s.auxiliary)
            .filter(|s| !excluded.contains(&s.id))
            .map(|s| (s.id, s.available.max(floor) + services.travel_time(s.position, pier)))
            .collect();
        out.sort_by_key(|&(id, ready)| (ready, id));
        out
    }

    /// Book `tugs` until `until`, leaving them at `end_point`.
    pub fn book(&mut self, tugs: &[TugId], end_point: GeoPoint, until: SimTime) {
        for id in tugs {
            if let Some(&i) = self.index.get(id) {
                let slot = &mut self.slots[i];
                slot.position = end_point;
                slot.available = slot.available.max(until);
            }
        }
    }
}

/// Every `k`-subset of `0..n`, in lexicographic order.
pub fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k == 0 || k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        // Rightmost position that can still advance.
        let Some(i) = (0..k).rev().find(|&i| idx[i] < n - k + i) else {
            return out;
        };
        idx[i] += 1;
        for j in i + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}
