//! harbor — compare the three dispatch policies on one synthetic day.
//!
//! Runs the day once per policy with the stochastic perturbation model,
//! writing `task_outcomes.csv`, `run_summary.csv` and `event_log.csv` to
//! `output/harbor/<policy>/`, then repeats every policy over a batch of seeds
//! to show the spread.
//!
//! ```text
//! cargo run -p harbor --release -- [config.json] [--verbose]
//! ```
//!
//! The optional JSON file may set any of `options`, `perturbation` and
//! `replications`; missing fields keep their defaults.

mod scenario;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Deserialize;

use tug_core::{SimTime, TaskId, TugId};
use tug_dispatch::{DispatchPlan, DispatchPolicy, GreedyProfit, NearestCapability, TimelineInsertion};
use tug_event::{Event, Outcome};
use tug_model::EntityPool;
use tug_output::{CsvWriter, EventLogObserver, OutputWriter};
use tug_port::{LinearPredictor, PortServices};
use tug_sim::{
    PerturbationConfig, ReplicationSummary, RunResult, SimBuilder, SimObserver, SimOptions,
    SimResult, Simulator, StochasticPerturbation, run_replications,
};

use scenario::Scenario;

// ── Configuration ─────────────────────────────────────────────────────────────

const SEED: u64 = 42;

#[derive(Deserialize)]
#[serde(default)]
struct HarborConfig {
    options:      SimOptions,
    perturbation: PerturbationConfig,
    replications: u64,
}

impl Default for HarborConfig {
    fn default() -> Self {
        Self {
            options:      SimOptions::default().with_seed(SEED),
            perturbation: PerturbationConfig::default(),
            replications: 32,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<HarborConfig> {
    let Some(path) = path else {
        return Ok(HarborConfig::default());
    };
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let config = serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

// ── Policies ──────────────────────────────────────────────────────────────────

fn greedy() -> Box<dyn DispatchPolicy> {
    Box::new(GreedyProfit::default())
}

fn nearest() -> Box<dyn DispatchPolicy> {
    Box::new(NearestCapability::default())
}

fn timeline() -> Box<dyn DispatchPolicy> {
    Box::new(TimelineInsertion::default())
}

const POLICIES: [fn() -> Box<dyn DispatchPolicy>; 3] = [greedy, nearest, timeline];

fn build(
    scenario:     &Scenario,
    options:      SimOptions,
    perturbation: &PerturbationConfig,
    policy:       Box<dyn DispatchPolicy>,
) -> SimResult<Simulator> {
    let services = PortServices::new(scenario.piers.clone(), LinearPredictor::default());
    SimBuilder::new(options, scenario.tasks.clone(), scenario.own.clone(), policy, services)
        .help_tugs(scenario.help.clone())
        .perturbation(StochasticPerturbation::new(perturbation.clone())?)
        .build()
}

// ── Observer wrapper with a console trace ─────────────────────────────────────

struct TraceObserver<W: OutputWriter> {
    inner:         EventLogObserver<W>,
    verbose:       bool,
    help_failures: usize,
    pool_changes:  usize,
}

impl<W: OutputWriter> TraceObserver<W> {
    fn new(inner: EventLogObserver<W>, verbose: bool) -> Self {
        Self { inner, verbose, help_failures: 0, pool_changes: 0 }
    }
}

impl<W: OutputWriter> SimObserver for TraceObserver<W> {
    fn on_pool(&mut self, now: SimTime, pool: &[TugId]) {
        self.pool_changes += 1;
        if self.verbose {
            let ids: Vec<String> = pool.iter().map(|t| t.0.to_string()).collect();
            println!("  {now}  duty pool [{}]", ids.join(" "));
        }
    }

    fn on_dispatch(&mut self, now: SimTime, plan: &DispatchPlan, help_failed: bool) {
        if help_failed {
            self.help_failures += 1;
        }
        if self.verbose {
            let staffed = plan.assigned().count();
            let note = if help_failed { "  (help unanswered)" } else { "" };
            println!("  {now}  dispatch: {staffed}/{} staffed{note}", plan.len());
        }
    }

    fn on_event(&mut self, event: &Event, outcome: Outcome, entities: &EntityPool) {
        if self.verbose {
            let task = event.task.map_or_else(|| "-".to_string(), |t| t.0.to_string());
            println!("  {}  {:<18} task {task:<4} {outcome:?}", event.time, event.kind.name());
        }
        self.inner.on_event(event, outcome, entities);
    }

    fn on_deferral(&mut self, now: SimTime, task: TaskId, attempt: u32) {
        if self.verbose {
            println!("  {now}  task {} unstaffed, deferral #{attempt}", task.0);
        }
        self.inner.on_deferral(now, task, attempt);
    }

    fn on_stall_guard(&mut self, now: SimTime, wake_at: SimTime) {
        if self.verbose {
            println!("  {now}  stall guard, wake at {wake_at}");
        }
    }

    fn on_sim_end(&mut self, result: &RunResult) {
        self.inner.on_sim_end(result);
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let mut config_path: Option<PathBuf> = None;
    let mut verbose = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            _ => config_path = Some(PathBuf::from(arg)),
        }
    }
    let config = load_config(config_path.as_deref())?;

    // 1. Scenario.
    let scenario = scenario::load()?;
    println!("=== harbor — tug dispatch simulator ===");
    println!(
        "Piers: {}  |  Own tugs: {}  |  Help tugs: {}  |  Jobs: {}  |  Seed: {}",
        scenario.piers.pier_count(),
        scenario.own.len(),
        scenario.help.len(),
        scenario.tasks.len(),
        config.options.seed,
    );
    println!();

    // 2. One traced run per policy.
    let mut results = Vec::new();
    for make in POLICIES {
        let policy = make();
        let name = policy.name().to_string();
        let mut sim = build(&scenario, config.options.clone(), &config.perturbation, policy)?;

        let dir = Path::new("output/harbor").join(&name);
        let writer = CsvWriter::new(&dir)?;
        let mut obs = TraceObserver::new(EventLogObserver::new(writer), verbose);

        if verbose {
            println!("--- {name} ---");
        }
        let t0 = Instant::now();
        let result = sim.run(&mut obs)?;
        let elapsed = t0.elapsed();

        if let Some(e) = obs.inner.take_error() {
            eprintln!("output error: {e}");
        }
        println!(
            "{name:<20} {:>6} events  {:>3} pool changes  {:>3} unanswered help calls  {:.3} ms  → {}",
            obs.inner.rows_written(),
            obs.pool_changes,
            obs.help_failures,
            elapsed.as_secs_f64() * 1e3,
            dir.display(),
        );
        results.push(result);
    }
    println!();

    // 3. Comparison table.
    println!(
        "{:<20} {:>5} {:>5} {:>12} {:>10} {:>10} {:>12} {:>7} {:>7}",
        "Policy", "Done", "Canc", "Revenue", "Moving", "Waiting", "Profit", "Exact", "Wait/j"
    );
    println!("{}", "-".repeat(96));
    for r in &results {
        println!(
            "{:<20} {:>5} {:>5} {:>12.0} {:>10.0} {:>10.0} {:>12.0} {:>6.1}% {:>7.1}",
            r.policy,
            r.completed,
            r.canceled,
            r.revenue,
            r.moving_cost,
            r.waiting_cost,
            r.profit,
            r.exact_ratio() * 100.0,
            r.mean_waiting_minutes(),
        );
    }
    println!();

    // 4. Per-company breakdown for the first policy.
    if let Some(r) = results.first() {
        println!("Companies under {}:", r.policy);
        for (company, totals) in &r.by_company {
            println!(
                "  company {:<3} {:>3} jobs  revenue {:>10.0}  moving {:>8.0}  profit {:>10.0}",
                company.0, totals.tasks, totals.revenue, totals.moving_cost, totals.profit
            );
        }
        println!();
    }

    // 5. Replications.
    let seeds: Vec<u64> = (0..config.replications).map(|i| config.options.seed + i).collect();
    println!("Replications: {} seeds", seeds.len());
    println!(
        "{:<20} {:>12} {:>10} {:>12} {:>12} {:>7}",
        "Policy", "Mean profit", "Std", "Min", "Max", "Exact"
    );
    println!("{}", "-".repeat(78));
    for make in POLICIES {
        let name = make().name().to_string();
        let t0 = Instant::now();
        let runs = run_replications(&seeds, |seed| {
            build(&scenario, config.options.clone().with_seed(seed), &config.perturbation, make())
        })?;
        let s = ReplicationSummary::of(&runs);
        println!(
            "{:<20} {:>12.0} {:>10.0} {:>12.0} {:>12.0} {:>6.1}%  ({:.2} s)",
            name,
            s.mean_profit,
            s.std_profit,
            s.min_profit,
            s.max_profit,
            s.mean_exact_ratio * 100.0,
            t0.elapsed().as_secs_f64(),
        );
    }

    Ok(())
}
