//! Per-day completion ledger.
//!
//! Merges recurring expectations with stored assignments and classifies
//! every date of a window as a rest day, a neutral day (nothing expected),
//! a fully completed day, or a missed day.

use super::recurrence::is_expected_on;
use super::types::{Assignment, DateRange, TaskDefinition, TaskId};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Classification of a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub date: NaiveDate,
    pub is_rest_day: bool,
    /// At least one task expected and the day is not a rest day.
    pub has_tasks: bool,
    pub completed_count: u32,
    pub missed_count: u32,
    /// True iff `has_tasks` and every expected task was completed.
    pub all_completed: bool,
    /// Minutes credited for the completed tasks of the day.
    pub completed_minutes: u64,
}

impl DayRecord {
    fn rest(date: NaiveDate) -> Self {
        Self {
            date,
            is_rest_day: true,
            has_tasks: false,
            completed_count: 0,
            missed_count: 0,
            all_completed: false,
            completed_minutes: 0,
        }
    }

    fn neutral(date: NaiveDate) -> Self {
        Self {
            is_rest_day: false,
            ..Self::rest(date)
        }
    }

    /// Rest days and fully completed days keep a streak going.
    pub fn keeps_streak(&self) -> bool {
        self.is_rest_day || self.all_completed
    }

    pub fn is_completed(&self) -> bool {
        self.has_tasks && self.all_completed
    }

    pub fn is_missed(&self) -> bool {
        self.has_tasks && !self.all_completed
    }

    /// Neither rest nor expected work: does not affect streaks.
    pub fn is_neutral(&self) -> bool {
        !self.is_rest_day && !self.has_tasks
    }
}

/// One expected task on one non-rest date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub task_id: TaskId,
    pub date: NaiveDate,
    pub completed: bool,
    /// Credited minutes; zero when not completed.
    pub minutes: u32,
}

/// Output of [`build_ledger`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    /// One record per date, chronological.
    pub days: Vec<DayRecord>,
    /// Expected occurrences on non-rest days, chronological.
    pub occurrences: Vec<Occurrence>,
}

impl Ledger {
    /// Record for `date`, if it lies inside the ledger's window.
    pub fn day(&self, date: NaiveDate) -> Option<&DayRecord> {
        self.days
            .binary_search_by_key(&date, |d| d.date)
            .ok()
            .map(|i| &self.days[i])
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    completed: bool,
    duration_override: Option<u32>,
}

/// Builds the ledger for `range`.
///
/// `assignments` may be the expander's output or just the stored
/// assignments; recurring expectations are derived here either way.
/// Several entries for the same task and date collapse into one
/// occurrence that counts as completed if any of them is. Entries for
/// unknown tasks are ignored.
pub fn build_ledger(
    tasks: &[TaskDefinition],
    assignments: &[Assignment],
    rest_days: &HashSet<NaiveDate>,
    range: DateRange,
) -> Ledger {
    let by_id: HashMap<TaskId, &TaskDefinition> = tasks.iter().map(|t| (t.id, t)).collect();

    let mut slots: HashMap<NaiveDate, BTreeMap<TaskId, Slot>> = HashMap::new();
    for assignment in assignments {
        let date = assignment.date();
        if !range.contains(date) || !by_id.contains_key(&assignment.task_id()) {
            continue;
        }
        let slot = slots
            .entry(date)
            .or_default()
            .entry(assignment.task_id())
            .or_default();
        if assignment.completed() && !slot.completed {
            slot.completed = true;
            slot.duration_override = assignment.duration_override();
        } else if !slot.completed && slot.duration_override.is_none() {
            slot.duration_override = assignment.duration_override();
        }
    }

    let mut ledger = Ledger {
        days: Vec::with_capacity(range.len()),
        occurrences: Vec::new(),
    };

    for date in range.days() {
        if rest_days.contains(&date) {
            ledger.days.push(DayRecord::rest(date));
            continue;
        }

        let mut expected = slots.remove(&date).unwrap_or_default();
        for task in tasks.iter().filter(|t| is_expected_on(t, date)) {
            expected.entry(task.id).or_default();
        }

        if expected.is_empty() {
            ledger.days.push(DayRecord::neutral(date));
            continue;
        }

        let mut record = DayRecord::neutral(date);
        record.has_tasks = true;
        for (task_id, slot) in expected {
            let minutes = if slot.completed {
                by_id[&task_id].minutes_for(slot.duration_override)
            } else {
                0
            };
            if slot.completed {
                record.completed_count += 1;
                record.completed_minutes += u64::from(minutes);
            } else {
                record.missed_count += 1;
            }
            ledger.occurrences.push(Occurrence {
                task_id,
                date,
                completed: slot.completed,
                minutes,
            });
        }
        record.all_completed = record.missed_count == 0;
        ledger.days.push(record);
    }

    ledger
}
