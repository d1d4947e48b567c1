//! The `DispatchPolicy` trait — the main extension point for user code.

mod greedy;
mod nearest;
mod timeline;

pub use greedy::GreedyProfit;
pub use nearest::NearestCapability;
pub use timeline::TimelineInsertion;

use tug_core::{Minutes, TugId};
use tug_model::{Task, Tug};

use crate::{DispatchPlan, DispatchRequest, DispatchResult};

/// Pluggable dispatch logic.
///
/// The scheduler calls [`dispatch`][Self::dispatch] whenever the set of
/// pending jobs or the state of the fleet changes.  The request is read-only;
/// a policy keeps no state between calls that would make its answer depend
/// on anything but the request.
///
/// # Contract
///
/// - At most one [`Proposal`][crate::Proposal] per offered job; proposals
///   for jobs that were not offered are ignored.
/// - A proposal names exactly `job.required.len()` tugs, or none.
/// - The proposed start is no earlier than every named tug can arrive.
/// - A derived job never names one of its parent's tugs.
/// - Help tugs appear only when [`DispatchRequest::wants_help`] allows it.
///
/// The scheduler re-checks timing, so a policy that misjudges travel time
/// produces a later start, not a double booking.  Naming a parent's tug for
/// a derived job is an error that ends the run.
pub trait DispatchPolicy: Send + Sync {
    /// Short name for reports.
    fn name(&self) -> &str;

    fn dispatch(&self, req: &DispatchRequest<'_>) -> DispatchResult<DispatchPlan>;
}

impl<P: DispatchPolicy + ?Sized> DispatchPolicy for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dispatch(&self, req: &DispatchRequest<'_>) -> DispatchResult<DispatchPlan> {
        (**self).dispatch(req)
    }
}

/// Expected work time of `job` served by `tugs`.
///
/// A derived job lasts as long as the rest of its parent's planned work.
pub(crate) fn estimate_work(
    req:  &DispatchRequest<'_>,
    job:  &Task,
    tugs: &[TugId],
) -> DispatchResult<Minutes> {
    if let Some(parent) = req.parent_of(job) {
        return Ok((parent.base_end_time() - job.scheduled_start).max(0));
    }
    let tugs: Vec<&Tug> = tugs
        .iter()
        .map(|&id| req.entities.tug(id))
        .collect::<Result<_, _>>()?;
    Ok(req.services.predict_work(job, &tugs)?)
}
