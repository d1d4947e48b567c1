//! Independent replications of one scenario under different seeds.

use crate::{NoopObserver, RunResult, SimResult, Simulator};

/// Spread of a set of replications.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplicationSummary {
    pub runs:               usize,
    pub mean_profit:        f64,
    pub std_profit:         f64,
    pub min_profit:         f64,
    pub max_profit:         f64,
    pub mean_revenue:       f64,
    pub mean_moving_cost:   f64,
    pub mean_waiting_cost:  f64,
    pub mean_exact_ratio:   f64,
    pub mean_completed:     f64,
}

impl ReplicationSummary {
    pub fn of(results: &[RunResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }
        let n = results.len() as f64;
        let mean = |f: fn(&RunResult) -> f64| results.iter().map(f).sum::<f64>() / n;

        let mean_profit = mean(|r| r.profit);
        let var = results.iter().map(|r| (r.profit - mean_profit).powi(2)).sum::<f64>() / n;
        Self {
            runs:              results.len(),
            mean_profit,
            std_profit:        var.sqrt(),
            min_profit:        results.iter().map(|r| r.profit).fold(f64::INFINITY, f64::min),
            max_profit:        results.iter().map(|r| r.profit).fold(f64::NEG_INFINITY, f64::max),
            mean_revenue:      mean(|r| r.revenue),
            mean_moving_cost:  mean(|r| r.moving_cost),
            mean_waiting_cost: mean(|r| r.waiting_cost),
            mean_exact_ratio:  mean(|r| r.exact_ratio()),
            mean_completed:    mean(|r| r.completed as f64),
        }
    }
}

/// Build and run one simulator per seed.  Results come back in seed order.
///
/// With the `parallel` feature the runs go to Rayon's thread pool; each
/// run owns its simulator, so `build` is the only thing shared.
pub fn run_replications<F>(seeds: &[u64], build: F) -> SimResult<Vec<RunResult>>
where
    F: Fn(u64) -> SimResult<Simulator> + Send + Sync,
{
    let one = |seed: u64| -> SimResult<RunResult> { build(seed)?.run(&mut NoopObserver) };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        seeds.par_iter().map(|&s| one(s)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        seeds.iter().map(|&s| one(s)).collect()
    }
}
