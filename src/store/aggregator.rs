//! Statistics aggregation utilities.
//!
//! Provides functions for computing streaks and totals from a day ledger,
//! both across all tasks and per task definition.

use super::ledger::{DayRecord, Occurrence};
use super::types::{TaskDefinition, TaskId, WeekdaySet};
use serde::Serialize;
use std::collections::HashMap;

/// Aggregates over the whole ledger window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    /// Tracked time in hours, rounded to one decimal.
    pub total_hours: f64,
    #[serde(skip)]
    pub total_minutes: u64,
    pub completed_days: u32,
    pub missed_days: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Aggregates for a single task definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub task_id: TaskId,
    pub task_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub total_hours: f64,
    #[serde(skip)]
    pub total_minutes: u64,
    pub completed_count: u32,
    pub missed_count: u32,
    pub is_recurring: bool,
    pub recurring_days: WeekdaySet,
}

/// Converts minutes to hours rounded to one decimal place.
pub fn minutes_to_hours(minutes: u64) -> f64 {
    (minutes as f64 / 60.0 * 10.0).round() / 10.0
}

/// Length of the streak ending at the most recent day.
///
/// Walks backward, counting rest days and fully completed days, skipping
/// neutral days, and stopping at the first missed day.
pub fn current_streak(days: &[DayRecord]) -> u32 {
    let mut streak = 0;
    for day in days.iter().rev() {
        if day.keeps_streak() {
            streak += 1;
        } else if day.is_missed() {
            break;
        }
    }
    streak
}

/// Longest run of streak-keeping days, ignoring neutral days.
pub fn longest_streak(days: &[DayRecord]) -> u32 {
    let mut longest = 0;
    let mut running = 0;
    for day in days {
        if day.keeps_streak() {
            running += 1;
            longest = longest.max(running);
        } else if day.is_missed() {
            running = 0;
        }
    }
    longest
}

/// Computes global statistics for a ledger.
pub fn aggregate(days: &[DayRecord]) -> GlobalStats {
    let total_minutes: u64 = days.iter().map(|d| d.completed_minutes).sum();

    GlobalStats {
        total_hours: minutes_to_hours(total_minutes),
        total_minutes,
        completed_days: days.iter().filter(|d| d.is_completed()).count() as u32,
        missed_days: days.iter().filter(|d| d.is_missed()).count() as u32,
        current_streak: current_streak(days),
        longest_streak: longest_streak(days),
    }
}

/// Computes per-task statistics, one entry per definition in input order.
///
/// Tasks without occurrences get all-zero counts.
pub fn aggregate_tasks(tasks: &[TaskDefinition], occurrences: &[Occurrence]) -> Vec<TaskStats> {
    let mut totals: HashMap<TaskId, (u32, u32, u64)> = HashMap::new();

    for occurrence in occurrences {
        let entry = totals.entry(occurrence.task_id).or_default();
        if occurrence.completed {
            entry.0 += 1;
            entry.2 += u64::from(occurrence.minutes);
        } else {
            entry.1 += 1;
        }
    }

    tasks
        .iter()
        .map(|task| {
            let (completed, missed, minutes) = totals.get(&task.id).copied().unwrap_or_default();
            TaskStats {
                task_id: task.id,
                task_name: task.text.clone(),
                description: task.description.clone(),
                total_hours: minutes_to_hours(minutes),
                total_minutes: minutes,
                completed_count: completed,
                missed_count: missed,
                is_recurring: task.is_recurring,
                recurring_days: task.recurring_days,
            }
        })
        .collect()
}
