//! Habit data types and the statistics engine.
//!
//! Everything in this module is pure: functions take read-only snapshots
//! of task definitions, assignments and rest days and return new values.
//! Fetching those snapshots is the job of [`crate::database`].

pub mod aggregator;
pub mod ledger;
pub mod projection;
pub mod recurrence;
pub mod types;

pub use aggregator::*;
pub use ledger::*;
pub use projection::*;
pub use recurrence::*;
pub use types::*;

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

/// Full statistics for a date window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub global: GlobalStats,
    pub tasks: Vec<TaskStats>,
    pub charts: Projections,
}

/// Runs expansion, ledger, aggregation and projections over a snapshot.
pub fn compute_report(
    tasks: &[TaskDefinition],
    assignments: &[TaskAssignment],
    rest_days: &HashSet<NaiveDate>,
    range: DateRange,
    today: NaiveDate,
    trend_days: u32,
) -> StatsReport {
    let expanded = expand(tasks, assignments, range);
    let ledger = build_ledger(tasks, &expanded, rest_days, range);
    let global = aggregate(&ledger.days);

    tracing::debug!(
        start = %range.start,
        end = %range.end,
        days = ledger.days.len(),
        completed_days = global.completed_days,
        missed_days = global.missed_days,
        current_streak = global.current_streak,
        "Computed statistics"
    );

    StatsReport {
        start_date: range.start,
        end_date: range.end,
        tasks: aggregate_tasks(tasks, &ledger.occurrences),
        charts: build_projections(&ledger, tasks, today, trend_days),
        global,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_report_on_empty_snapshot() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let range = DateRange::new(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), today);

        let report = compute_report(&[], &[], &HashSet::new(), range, today, DEFAULT_TREND_DAYS);

        assert_eq!(report.global, GlobalStats::default());
        assert!(report.tasks.is_empty());
        assert_eq!(report.charts.heatmap.len(), 10);
        assert_eq!(report.charts.trend.len(), 30);
        assert!(report.charts.distribution.is_empty());
    }
}
