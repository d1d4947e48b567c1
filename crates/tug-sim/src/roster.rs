//! `DutyRoster` — which own-fleet tugs the dispatcher may use right now.

use tug_core::{SimTime, TugId};
use tug_model::{EntityPool, InvariantViolation, TugState};

/// Tracks the duty pool across refreshes.
///
/// The pool holds every own-fleet tug that is busy or whose crew is on
/// shift.  When fewer than `floor` tugs qualify, free off-shift tugs are
/// called in, in fleet order, until the pool holds `floor + 1`.
#[derive(Clone, Debug)]
pub struct DutyRoster {
    floor:    usize,
    previous: Vec<TugId>,
}

impl DutyRoster {
    pub fn new(floor: usize) -> Self {
        Self { floor, previous: Vec::new() }
    }

    /// The pool as of the last refresh.
    pub fn current(&self) -> &[TugId] {
        &self.previous
    }

    /// Recompute the pool at `now`.
    ///
    /// A free tug that joins the pool cannot leave before `now`: its
    /// availability is raised to `now` if it was earlier.
    pub fn refresh(&mut self, entities: &mut EntityPool, now: SimTime) -> Result<Vec<TugId>, InvariantViolation> {
        let own = || {
            entities
                .tugs()
                .iter()
                .filter(|t| !t.auxiliary && t.state != TugState::Unavailable)
        };

        let mut pool: Vec<TugId> = own()
            .filter(|t| t.state == TugState::Busy || t.shift.covers(now))
            .map(|t| t.id)
            .collect();
        if pool.len() < self.floor {
            let backfill: Vec<TugId> = own()
                .filter(|t| t.is_free() && !pool.contains(&t.id))
                .map(|t| t.id)
                .take(self.floor + 1 - pool.len())
                .collect();
            pool.extend(backfill);
        }

        for &id in &pool {
            if self.previous.contains(&id) {
                continue;
            }
            let tug = entities.tug_mut(id)?;
            if tug.is_free() && tug.next_available < now {
                tug.next_available = now;
            }
        }
        self.previous = pool.clone();
        Ok(pool)
    }
}
