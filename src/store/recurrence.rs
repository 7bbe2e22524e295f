//! Recurrence expansion.
//!
//! Turns weekly recurrence patterns into concrete occurrences for a date
//! window. Dates that already have a stored assignment for a task are left
//! alone; every other expected date gets a virtual entry.

use super::types::{Assignment, DateRange, TaskAssignment, TaskDefinition, TaskId};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Whether `task` is expected on `date` by virtue of its recurrence.
///
/// A recurring task with no days is never expected.
pub fn is_expected_on(task: &TaskDefinition, date: NaiveDate) -> bool {
    task.is_recurring && task.recurring_days.contains_date(date)
}

/// Dates in `range` on which `task` recurs.
pub fn expected_dates(task: &TaskDefinition, range: DateRange) -> Vec<NaiveDate> {
    range.days().filter(|d| is_expected_on(task, *d)).collect()
}

/// Returns the stored assignments plus a virtual entry for every
/// recurring occurrence in `range` that has no stored counterpart.
///
/// Ordering of the result is not significant.
pub fn expand(
    tasks: &[TaskDefinition],
    existing: &[TaskAssignment],
    range: DateRange,
) -> Vec<Assignment> {
    let persisted: HashSet<(TaskId, NaiveDate)> =
        existing.iter().map(|a| (a.task_id, a.date_str)).collect();

    let mut expanded: Vec<Assignment> = existing
        .iter()
        .cloned()
        .map(Assignment::Persisted)
        .collect();

    let recurring: Vec<&TaskDefinition> = tasks
        .iter()
        .filter(|t| t.is_recurring && !t.recurring_days.is_empty())
        .collect();

    for date in range.days() {
        for task in recurring.iter().filter(|t| is_expected_on(t, date)) {
            if !persisted.contains(&(task.id, date)) {
                expanded.push(Assignment::Virtual {
                    task_id: task.id,
                    date_str: date,
                });
            }
        }
    }

    tracing::trace!(
        stored = existing.len(),
        virtual_count = expanded.len() - existing.len(),
        "Expanded recurring tasks"
    );

    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::WeekdaySet;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn week() -> DateRange {
        // Sunday 2026-03-01 .. Saturday 2026-03-07
        DateRange::new(date("2026-03-01"), date("2026-03-07"))
    }

    #[test]
    fn test_expand_weekday_pattern() {
        let mwf = WeekdaySet::from_indices(&[1, 3, 5]).unwrap();
        let tasks = vec![TaskDefinition::new(1, "Gym", 60).with_recurrence(mwf)];

        let expanded = expand(&tasks, &[], week());

        let mut dates: Vec<_> = expanded.iter().map(|a| a.date()).collect();
        dates.sort();
        assert_eq!(
            dates,
            vec![date("2026-03-02"), date("2026-03-04"), date("2026-03-06")]
        );
        assert!(expanded.iter().all(|a| a.is_virtual() && !a.completed()));
    }

    #[test]
    fn test_expand_skips_stored_occurrences() {
        let tasks = vec![TaskDefinition::new(1, "Read", 20).with_recurrence(WeekdaySet::ALL)];
        let mut stored = TaskAssignment::new(10, 1, date("2026-03-03"));
        stored.completed = true;

        let expanded = expand(&tasks, &[stored], week());

        assert_eq!(expanded.len(), 7);
        let on_third: Vec<_> = expanded
            .iter()
            .filter(|a| a.date() == date("2026-03-03"))
            .collect();
        assert_eq!(on_third.len(), 1);
        assert!(!on_third[0].is_virtual());
        assert!(on_third[0].completed());
    }

    #[test]
    fn test_expand_ignores_one_off_and_empty_patterns() {
        let tasks = vec![
            TaskDefinition::new(1, "Dentist", 60),
            TaskDefinition::new(2, "Broken", 10).with_recurrence(WeekdaySet::default()),
        ];
        assert!(expand(&tasks, &[], week()).is_empty());
    }

    #[test]
    fn test_expand_backwards_range_is_empty() {
        let tasks = vec![TaskDefinition::new(1, "Read", 20).with_recurrence(WeekdaySet::ALL)];
        let range = DateRange::new(date("2026-03-07"), date("2026-03-01"));
        assert!(expand(&tasks, &[], range).is_empty());
    }

    #[test]
    fn test_expand_is_idempotent() {
        let tasks = vec![
            TaskDefinition::new(1, "Read", 20).with_recurrence(WeekdaySet::ALL),
            TaskDefinition::new(2, "Gym", 60)
                .with_recurrence(WeekdaySet::from_indices(&[2, 4]).unwrap()),
        ];
        let stored = vec![TaskAssignment::new(5, 2, date("2026-03-03"))];

        let key = |a: &Assignment| (a.task_id(), a.date(), a.is_virtual());
        let mut first: Vec<_> = expand(&tasks, &stored, week()).iter().map(key).collect();
        let mut second: Vec<_> = expand(&tasks, &stored, week()).iter().map(key).collect();
        first.sort();
        second.sort();
        assert_eq!(first, second);
    }

    #[test]
    fn test_expected_dates() {
        let task = TaskDefinition::new(1, "Long run", 90)
            .with_recurrence(WeekdaySet::from_indices(&[0, 6]).unwrap());
        assert_eq!(
            expected_dates(&task, week()),
            vec![date("2026-03-01"), date("2026-03-07")]
        );
    }
}
