//! Harbour billing rules.
//!
//! Each tug is billed at the hourly rate of the *lower* of its own class and
//! the requirement it fills: assigned and required classes are both sorted
//! ascending and paired off; tugs beyond the requirement bill at their own
//! class.  The billed period runs from the tug's departure to the end of
//! the job and is rounded in half-hour steps after the first hour.

use tug_core::{CapabilityClass, Minutes, SimTime, TugId};

use crate::Priority;

/// Waiting penalty per minute of delay past the scheduled start.
pub const WAITING_PENALTY_PER_MINUTE: f64 = 100.0;

/// Billing units for a period of `minutes`: one unit for the first hour, then
/// half a unit per started half hour.
pub fn billed_units(minutes: Minutes) -> f64 {
    if minutes <= 60 {
        1.0
    } else {
        1.0 + 0.5 * ((minutes - 60) as f64 / 30.0).ceil()
    }
}

/// The class each tug is billed at.
pub fn billing_classes(
    required: &[CapabilityClass],
    assigned: &[(TugId, CapabilityClass)],
) -> Vec<(TugId, CapabilityClass)> {
    let mut req = required.to_vec();
    req.sort_unstable();
    let mut tugs = assigned.to_vec();
    tugs.sort_by_key(|&(id, class)| (class, id));
    tugs.into_iter()
        .enumerate()
        .map(|(i, (id, class))| match req.get(i) {
            Some(&r) => (id, r.min(class)),
            None => (id, class),
        })
        .collect()
}

/// Revenue of a job ending at `end`, given each tug's class and departure.
pub fn revenue(
    required: &[CapabilityClass],
    tugs:     &[(TugId, CapabilityClass, SimTime)],
    end:      SimTime,
) -> f64 {
    let assigned: Vec<(TugId, CapabilityClass)> = tugs.iter().map(|&(id, c, _)| (id, c)).collect();
    billing_classes(required, &assigned)
        .into_iter()
        .map(|(id, billed)| {
            let depart = tugs
                .iter()
                .find(|(t, _, _)| *t == id)
                .map_or(end, |&(_, _, d)| d);
            billed.hourly_rate() * billed_units(end - depart)
        })
        .sum()
}

/// Penalty for starting `minutes` late.
pub fn waiting_cost(minutes: Minutes, priority: Priority) -> f64 {
    minutes.max(0) as f64 * WAITING_PENALTY_PER_MINUTE * priority.weight()
}
