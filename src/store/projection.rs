//! Chart-ready projections of a day ledger.

use super::ledger::{Ledger, Occurrence};
use super::types::{TaskDefinition, TaskId};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Default length of the trend window, in days.
pub const DEFAULT_TREND_DAYS: u32 = 30;

/// One cell of the activity heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub count: u32,
    pub missed: u32,
    pub level: u8,
}

/// Completed and missed counts for one day of the trend window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub completed: u32,
    pub missed: u32,
}

/// Number of completions for one task name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionEntry {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projections {
    pub heatmap: Vec<HeatmapCell>,
    pub trend: Vec<TrendPoint>,
    pub distribution: Vec<DistributionEntry>,
}

/// Buckets a completed-task count into a heatmap level from 0 to 4.
pub fn heatmap_level(count: u32) -> u8 {
    match count {
        7.. => 4,
        5..=6 => 3,
        3..=4 => 2,
        1..=2 => 1,
        0 => 0,
    }
}

pub fn heatmap(ledger: &Ledger) -> Vec<HeatmapCell> {
    ledger
        .days
        .iter()
        .map(|d| HeatmapCell {
            date: d.date,
            count: d.completed_count,
            missed: d.missed_count,
            level: heatmap_level(d.completed_count),
        })
        .collect()
}

/// The `window` days ending at `today`, oldest first.
///
/// Days outside the ledger are reported with zero counts.
pub fn trend(ledger: &Ledger, today: NaiveDate, window: u32) -> Vec<TrendPoint> {
    (0..i64::from(window))
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let (completed, missed) = ledger
                .day(date)
                .map(|d| (d.completed_count, d.missed_count))
                .unwrap_or((0, 0));
            TrendPoint {
                date,
                completed,
                missed,
            }
        })
        .collect()
}

/// Completions per task name, dropping names with none.
///
/// Sorted by count descending, then name.
pub fn distribution(
    tasks: &[TaskDefinition],
    occurrences: &[Occurrence],
) -> Vec<DistributionEntry> {
    let names: HashMap<TaskId, &str> = tasks.iter().map(|t| (t.id, t.text.as_str())).collect();

    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for occurrence in occurrences.iter().filter(|o| o.completed) {
        if let Some(name) = names.get(&occurrence.task_id) {
            *counts.entry(*name).or_default() += 1;
        }
    }

    let mut entries: Vec<DistributionEntry> = counts
        .into_iter()
        .filter(|(_, value)| *value > 0)
        .map(|(name, value)| DistributionEntry {
            name: name.to_string(),
            value,
        })
        .collect();
    entries.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    entries
}

pub fn build_projections(
    ledger: &Ledger,
    tasks: &[TaskDefinition],
    today: NaiveDate,
    trend_days: u32,
) -> Projections {
    Projections {
        heatmap: heatmap(ledger),
        trend: trend(ledger, today, trend_days),
        distribution: distribution(tasks, &ledger.occurrences),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ledger::build_ledger;
    use crate::store::types::{Assignment, DateRange, TaskAssignment, WeekdaySet};
    use std::collections::HashSet;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_heatmap_thresholds() {
        let levels: Vec<u8> = (0..=8).map(heatmap_level).collect();
        assert_eq!(levels, vec![0, 1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn test_trend_zero_fills_outside_ledger() {
        let tasks = vec![TaskDefinition::new(1, "Read", 20).with_recurrence(WeekdaySet::ALL)];
        let range = DateRange::new(date("2026-03-10"), date("2026-03-12"));
        let ledger = build_ledger(&tasks, &[], &HashSet::new(), range);

        let points = trend(&ledger, date("2026-03-12"), 5);

        assert_eq!(points.len(), 5);
        assert_eq!(points[0].date, date("2026-03-08"));
        assert_eq!(points[4].date, date("2026-03-12"));
        assert_eq!((points[0].completed, points[0].missed), (0, 0));
        assert_eq!((points[1].completed, points[1].missed), (0, 0));
        assert_eq!(points[2].missed, 1);
        assert!(trend(&ledger, date("2026-03-12"), 0).is_empty());
    }

    #[test]
    fn test_distribution_drops_zero_and_merges_names() {
        let tasks = vec![
            TaskDefinition::new(1, "Read", 20),
            TaskDefinition::new(2, "Read", 20),
            TaskDefinition::new(3, "Gym", 60),
            TaskDefinition::new(4, "Never", 5),
        ];
        let mut assignments = Vec::new();
        let completions = [(1, 1, "2026-03-02"), (2, 2, "2026-03-03"), (3, 3, "2026-03-02")];
        for (id, task_id, day) in completions {
            let mut a = TaskAssignment::new(id, task_id, date(day));
            a.completed = true;
            assignments.push(Assignment::Persisted(a));
        }
        assignments.push(Assignment::Persisted(TaskAssignment::new(4, 4, date("2026-03-02"))));

        let range = DateRange::new(date("2026-03-02"), date("2026-03-03"));
        let ledger = build_ledger(&tasks, &assignments, &HashSet::new(), range);
        let entries = distribution(&tasks, &ledger.occurrences);

        assert_eq!(
            entries,
            vec![
                DistributionEntry {
                    name: "Read".into(),
                    value: 2
                },
                DistributionEntry {
                    name: "Gym".into(),
                    value: 1
                },
            ]
        );
    }
}
