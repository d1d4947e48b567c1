//! Plain data row types written by output backends.

use tug_core::{Minutes, format_class_list};
use tug_event::{Event, EventKind, Outcome};
use tug_sim::{RunResult, TaskOutcome};

/// One applied event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub time:    i64,
    /// `None` for Routine wake-ups.
    pub task:    Option<i32>,
    pub kind:    &'static str,
    /// Payload: class list or minutes, empty for kinds without one.
    pub detail:  String,
    /// `applied`, `redispatch`, `ignored` or `deferred`.
    pub outcome: &'static str,
}

impl EventRow {
    pub fn new(event: &Event, outcome: Outcome) -> Self {
        Self {
            time:    event.time.0,
            task:    event.task.map(|t| t.0),
            kind:    event.kind.name(),
            detail:  detail(&event.kind),
            outcome: outcome_name(outcome),
        }
    }
}

fn detail(kind: &EventKind) -> String {
    match kind {
        EventKind::RequirementChange { required } => format_class_list(required),
        EventKind::TemporaryNeed { extra } => format_class_list(extra),
        EventKind::StartDelay { delay } | EventKind::WorkDelay { delay } => delay.to_string(),
        _ => String::new(),
    }
}

fn outcome_name(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Applied => "applied",
        Outcome::Redispatch => "redispatch",
        Outcome::Ignored => "ignored",
    }
}

/// Final figures of one scheduled job.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub task_id:         i32,
    pub ship_id:         u32,
    pub movement:        &'static str,
    pub state:           &'static str,
    pub scheduled_start: i64,
    pub realized_start:  i64,
    pub end:             i64,
    /// `;`-separated class codes.
    pub required:        String,
    pub assigned:        String,
    /// `;`-separated tug ids, in assignment order.
    pub tugs:            String,
    /// Empty when no tug was assigned.
    pub company:         String,
    pub temporary_need:  bool,
    pub moving_cost:     f64,
    pub moving_minutes:  Minutes,
    pub waiting_minutes: Minutes,
    pub waiting_cost:    f64,
    pub revenue:         f64,
    pub profit:          f64,
    pub exact:           usize,
    pub over:            usize,
    pub under:           usize,
}

impl From<&TaskOutcome> for TaskRow {
    fn from(o: &TaskOutcome) -> Self {
        let classes: Vec<_> = o.tugs.iter().map(|&(_, c)| c).collect();
        Self {
            task_id:         o.task.0,
            ship_id:         o.ship.0,
            movement:        o.movement.as_str(),
            state:           o.state.as_str(),
            scheduled_start: o.scheduled_start.0,
            realized_start:  o.realized_start.0,
            end:             o.end.0,
            required:        format_class_list(&o.required),
            assigned:        format_class_list(&classes),
            tugs:            o.tugs.iter().map(|(id, _)| id.0.to_string()).collect::<Vec<_>>().join(";"),
            company:         o.company.map(|c| c.0.to_string()).unwrap_or_default(),
            temporary_need:  o.temporary_need,
            moving_cost:     o.moving_cost,
            moving_minutes:  o.moving_minutes,
            waiting_minutes: o.waiting_minutes,
            waiting_cost:    o.waiting_cost,
            revenue:         o.revenue,
            profit:          o.profit,
            exact:           o.matches.exact,
            over:            o.matches.over,
            under:           o.matches.under,
        }
    }
}

/// Run totals.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub policy:          String,
    pub seed:            u64,
    pub completed:       usize,
    pub canceled:        usize,
    pub revenue:         f64,
    pub moving_cost:     f64,
    pub moving_minutes:  Minutes,
    pub waiting_cost:    f64,
    pub waiting_minutes: Minutes,
    pub profit:          f64,
    pub exact_ratio:     f64,
    pub over_ratio:      f64,
    pub under_ratio:     f64,
    pub events:          u64,
    pub dispatch_rounds: u64,
    pub help_failures:   u64,
    pub deferrals:       u64,
}

impl From<&RunResult> for SummaryRow {
    fn from(r: &RunResult) -> Self {
        Self {
            policy:          r.policy.clone(),
            seed:            r.seed,
            completed:       r.completed,
            canceled:        r.canceled,
            revenue:         r.revenue,
            moving_cost:     r.moving_cost,
            moving_minutes:  r.moving_minutes,
            waiting_cost:    r.waiting_cost,
            waiting_minutes: r.waiting_minutes,
            profit:          r.profit,
            exact_ratio:     r.exact_ratio(),
            over_ratio:      r.over_ratio(),
            under_ratio:     r.under_ratio(),
            events:          r.stats.events,
            dispatch_rounds: r.stats.dispatch_rounds,
            help_failures:   r.stats.help_failures,
            deferrals:       r.stats.deferrals,
        }
    }
}
