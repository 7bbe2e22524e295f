//! Data types for habit tracking.
//!
//! Defines the persisted entities (task definitions, assignments, rest
//! days, notes and tracking records), the patch structs used to update
//! them, and the calendar helpers the statistics engine works with.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Identifier of a task definition.
pub type TaskId = i64;

/// Set of weekdays a recurring task is expected on.
///
/// Indices follow the calendar convention Sunday = 0 through Saturday = 6.
/// Serialized as a JSON array of indices, e.g. `[1, 3, 5]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Every day of the week.
    pub const ALL: WeekdaySet = WeekdaySet(0b111_1111);

    /// Builds a set from raw bits; bits above Saturday are dropped.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Builds a set from weekday indices, rejecting anything outside 0..=6.
    pub fn from_indices(indices: &[u8]) -> Result<Self> {
        let mut set = Self::default();
        for &index in indices {
            if index > 6 {
                return Err(Error::Validation(format!(
                    "weekday index {index} is outside 0..=6"
                )));
            }
            set.0 |= 1 << index;
        }
        Ok(set)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(self, index: u8) -> bool {
        index <= 6 && self.0 & (1 << index) != 0
    }

    /// Whether the weekday of `date` is in the set.
    pub fn contains_date(self, date: NaiveDate) -> bool {
        self.contains(date.weekday().num_days_from_sunday() as u8)
    }

    /// Weekday indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..=6u8).filter(move |&i| self.contains(i))
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = Error;

    fn try_from(indices: Vec<u8>) -> Result<Self> {
        Self::from_indices(&indices)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.iter().collect()
    }
}

/// Inclusive calendar date window.
///
/// A window whose start lies after its end is empty rather than invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days in the window.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }

    /// Iterates the dates in the window in chronological order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// A reusable template describing a habit and its default duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub id: TaskId,

    /// Short label shown on the calendar.
    pub text: String,

    pub description: Option<String>,

    /// Default duration of one occurrence, in minutes.
    pub baseline_duration: u32,

    pub is_recurring: bool,

    /// Weekdays the task is expected on. Only meaningful if `is_recurring`.
    pub recurring_days: WeekdaySet,

    pub created_at: String,
    pub updated_at: String,
}

impl TaskDefinition {
    /// Creates a one-off task definition stamped with the current time.
    pub fn new(id: TaskId, text: impl Into<String>, baseline_duration: u32) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id,
            text: text.into(),
            description: None,
            baseline_duration,
            is_recurring: false,
            recurring_days: WeekdaySet::default(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Turns this definition into a recurring one on the given weekdays.
    pub fn with_recurrence(mut self, days: WeekdaySet) -> Self {
        self.is_recurring = true;
        self.recurring_days = days;
        self
    }

    /// Minutes credited for one completed occurrence.
    ///
    /// A zero override is treated as absent.
    pub fn minutes_for(&self, duration_override: Option<u32>) -> u32 {
        duration_override
            .filter(|m| *m > 0)
            .unwrap_or(self.baseline_duration)
    }

    /// Applies a patch, leaving `self` untouched if the result is invalid.
    pub fn apply(&mut self, patch: &TaskPatch) -> Result<()> {
        let mut next = self.clone();
        if let Some(text) = &patch.text {
            next.text = text.clone();
        }
        if let Some(description) = &patch.description {
            next.description = normalize_description(Some(description.clone()));
        }
        if let Some(minutes) = patch.baseline_duration {
            next.baseline_duration = minutes;
        }
        if let Some(is_recurring) = patch.is_recurring {
            next.is_recurring = is_recurring;
        }
        if let Some(days) = patch.recurring_days {
            next.recurring_days = days;
        }
        validate_task_fields(
            &next.text,
            next.baseline_duration,
            next.is_recurring,
            next.recurring_days,
        )?;
        *self = next;
        Ok(())
    }
}

/// Body of a task creation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub text: String,
    #[serde(default)]
    pub description: Option<String>,
    pub baseline_duration: u32,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_days: WeekdaySet,
}

impl NewTask {
    pub fn validate(&self) -> Result<()> {
        validate_task_fields(
            &self.text,
            self.baseline_duration,
            self.is_recurring,
            self.recurring_days,
        )
    }

    /// Description with blank values collapsed to `None`.
    pub fn description(&self) -> Option<String> {
        normalize_description(self.description.clone())
    }
}

/// Partial update of a task definition. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub text: Option<String>,
    /// An empty string clears the description.
    pub description: Option<String>,
    pub baseline_duration: Option<u32>,
    pub is_recurring: Option<bool>,
    pub recurring_days: Option<WeekdaySet>,
}

fn validate_task_fields(
    text: &str,
    baseline_duration: u32,
    is_recurring: bool,
    recurring_days: WeekdaySet,
) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::Validation("task text must not be empty".into()));
    }
    if baseline_duration == 0 {
        return Err(Error::Validation(
            "baselineDuration must be a positive number of minutes".into(),
        ));
    }
    if is_recurring && recurring_days.is_empty() {
        return Err(Error::Validation(
            "a recurring task needs at least one recurring day".into(),
        ));
    }
    Ok(())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

/// A persisted binding of one task definition to one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub id: i64,
    pub task_id: TaskId,
    pub date_str: NaiveDate,

    /// Overrides the task's baseline duration for this occurrence.
    pub duration_override: Option<u32>,

    pub completed: bool,

    pub logged_hours: f64,

    pub created_at: String,
    pub updated_at: String,
}

impl TaskAssignment {
    /// Creates an uncompleted assignment stamped with the current time.
    pub fn new(id: i64, task_id: TaskId, date_str: NaiveDate) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id,
            task_id,
            date_str,
            duration_override: None,
            completed: false,
            logged_hours: 0.0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: &AssignmentPatch) -> Result<()> {
        patch.validate()?;
        if let Some(duration_override) = patch.duration_override {
            self.duration_override = duration_override;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(hours) = patch.logged_hours {
            self.logged_hours = hours;
        }
        Ok(())
    }
}

/// Body of an assignment creation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub task_id: TaskId,
    pub date_str: NaiveDate,
    #[serde(default)]
    pub duration_override: Option<u32>,
    #[serde(default)]
    pub logged_hours: f64,
    #[serde(default)]
    pub completed: bool,
}

impl NewAssignment {
    pub fn validate(&self) -> Result<()> {
        validate_override(self.duration_override)?;
        validate_hours("loggedHours", self.logged_hours)
    }
}

/// Partial update of an assignment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPatch {
    /// Absent leaves the override alone; `null` clears it back to the
    /// task's baseline.
    #[serde(default, deserialize_with = "present")]
    pub duration_override: Option<Option<u32>>,
    pub completed: Option<bool>,
    pub logged_hours: Option<f64>,
}

impl AssignmentPatch {
    pub fn validate(&self) -> Result<()> {
        validate_override(self.duration_override.flatten())?;
        match self.logged_hours {
            Some(hours) => validate_hours("loggedHours", hours),
            None => Ok(()),
        }
    }
}

/// Wraps a present field in `Some`, so an explicit `null` is told apart
/// from a missing field (which falls back to `Default`).
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn validate_override(duration_override: Option<u32>) -> Result<()> {
    if duration_override == Some(0) {
        return Err(Error::Validation(
            "durationOverride must be a positive number of minutes".into(),
        ));
    }
    Ok(())
}

fn validate_hours(field: &str, hours: f64) -> Result<()> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(Error::Validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(())
}

/// An occurrence of a task on a date, either stored or synthesized.
///
/// Virtual occurrences come from recurrence expansion and only become
/// persisted once the user changes them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Assignment {
    Persisted(TaskAssignment),
    #[serde(rename_all = "camelCase")]
    Virtual { task_id: TaskId, date_str: NaiveDate },
}

impl Assignment {
    pub fn task_id(&self) -> TaskId {
        match self {
            Assignment::Persisted(a) => a.task_id,
            Assignment::Virtual { task_id, .. } => *task_id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Assignment::Persisted(a) => a.date_str,
            Assignment::Virtual { date_str, .. } => *date_str,
        }
    }

    pub fn completed(&self) -> bool {
        matches!(self, Assignment::Persisted(a) if a.completed)
    }

    pub fn duration_override(&self) -> Option<u32> {
        match self {
            Assignment::Persisted(a) => a.duration_override,
            Assignment::Virtual { .. } => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Assignment::Virtual { .. })
    }
}

/// A date marked as a rest day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOff {
    pub id: i64,
    pub date_str: NaiveDate,
    pub created_at: String,
}

/// Free-text note attached to a date. Empty content means "cleared".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayNote {
    pub id: i64,
    pub date_str: NaiveDate,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Historical record of hours logged against an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTracking {
    pub id: i64,
    pub assignment_id: i64,
    pub task_id: TaskId,
    pub hours_logged: f64,
    pub day_completed: bool,
    pub total_hours: f64,
    /// Recurrence of the task at the time the record was written.
    pub recurring_days: Option<WeekdaySet>,
    /// Set whenever the record is written with `day_completed = true`.
    pub completion_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskTracking {
    pub fn apply(&mut self, patch: &TrackingPatch, now: &str) -> Result<()> {
        patch.validate()?;
        if let Some(hours) = patch.hours_logged {
            self.hours_logged = hours;
        }
        if let Some(total) = patch.total_hours {
            self.total_hours = total;
        }
        if let Some(done) = patch.day_completed {
            self.day_completed = done;
            if done {
                self.completion_date = Some(now.to_string());
            }
        }
        self.updated_at = now.to_string();
        Ok(())
    }
}

/// Body of a tracking record creation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTracking {
    pub assignment_id: i64,
    pub task_id: TaskId,
    pub hours_logged: f64,
    #[serde(default)]
    pub day_completed: bool,
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default)]
    pub recurring_days: Option<WeekdaySet>,
}

impl NewTracking {
    pub fn validate(&self) -> Result<()> {
        validate_hours("hoursLogged", self.hours_logged)?;
        validate_hours("totalHours", self.total_hours)
    }
}

/// Partial update of a tracking record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPatch {
    pub hours_logged: Option<f64>,
    pub day_completed: Option<bool>,
    pub total_hours: Option<f64>,
}

impl TrackingPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(hours) = self.hours_logged {
            validate_hours("hoursLogged", hours)?;
        }
        if let Some(hours) = self.total_hours {
            validate_hours("totalHours", hours)?;
        }
        Ok(())
    }
}

/// Aggregate over the tracking history of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStats {
    pub task_id: TaskId,
    pub total_hours: f64,
    pub days_completed: u32,
    pub total_instances: u32,
    pub average_hours_per_day: f64,
}

impl TrackingStats {
    /// Folds a task's tracking history into totals.
    pub fn from_records(task_id: TaskId, records: &[TaskTracking]) -> Self {
        let total_hours: f64 = records.iter().map(|t| t.hours_logged).sum();
        let days_completed = records.iter().filter(|t| t.day_completed).count() as u32;
        let total_instances = records.len() as u32;

        Self {
            task_id,
            total_hours,
            days_completed,
            total_instances,
            average_hours_per_day: if total_instances > 0 {
                total_hours / f64::from(total_instances)
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_weekday_set_serializes_as_index_array() {
        let set = WeekdaySet::from_indices(&[5, 1, 3]).unwrap();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[1,3,5]");

        let back: WeekdaySet = serde_json::from_str("[0,6]").unwrap();
        assert!(back.contains(0));
        assert!(back.contains(6));
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn test_weekday_set_rejects_out_of_range() {
        assert!(serde_json::from_str::<WeekdaySet>("[7]").is_err());
        assert!(WeekdaySet::from_indices(&[1, 9]).is_err());
    }

    #[test]
    fn test_weekday_set_contains_date() {
        // 2026-03-01 is a Sunday
        let sundays = WeekdaySet::from_indices(&[0]).unwrap();
        assert!(sundays.contains_date(date("2026-03-01")));
        assert!(!sundays.contains_date(date("2026-03-02")));
        assert!(WeekdaySet::ALL.contains_date(date("2026-03-04")));
    }

    #[test]
    fn test_date_range_days() {
        let range = DateRange::new(date("2026-02-27"), date("2026-03-02"));
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 4);
        assert_eq!(range.len(), 4);
        assert_eq!(days[2], date("2026-03-01"));

        let backwards = DateRange::new(date("2026-03-02"), date("2026-03-01"));
        assert!(backwards.is_empty());
        assert_eq!(backwards.days().count(), 0);
    }

    #[test]
    fn test_new_task_validation() {
        let body: NewTask =
            serde_json::from_str(r#"{"text":"Read","baselineDuration":30,"isRecurring":true}"#)
                .unwrap();
        assert!(matches!(body.validate(), Err(Error::Validation(_))));

        let body: NewTask = serde_json::from_str(
            r#"{"text":"Read","baselineDuration":30,"isRecurring":true,"recurringDays":[1]}"#,
        )
        .unwrap();
        assert!(body.validate().is_ok());

        let body: NewTask =
            serde_json::from_str(r#"{"text":"  ","baselineDuration":30}"#).unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_task_patch_is_atomic() {
        let mut task = TaskDefinition::new(1, "Stretch", 15);
        let patch = TaskPatch {
            text: Some("Yoga".into()),
            is_recurring: Some(true),
            ..Default::default()
        };

        // Recurring without days is rejected and nothing changes
        assert!(task.apply(&patch).is_err());
        assert_eq!(task.text, "Stretch");

        let patch = TaskPatch {
            recurring_days: Some(WeekdaySet::ALL),
            description: Some(String::new()),
            ..patch
        };
        task.apply(&patch).unwrap();
        assert_eq!(task.text, "Yoga");
        assert!(task.is_recurring);
        assert!(task.description.is_none());
    }

    #[test]
    fn test_minutes_for_override() {
        let task = TaskDefinition::new(1, "Run", 30);
        assert_eq!(task.minutes_for(None), 30);
        assert_eq!(task.minutes_for(Some(45)), 45);
        assert_eq!(task.minutes_for(Some(0)), 30);
    }

    #[test]
    fn test_assignment_patch_null_clears_override() {
        let mut assignment = TaskAssignment::new(1, 1, date("2026-03-02"));
        assignment.duration_override = Some(45);

        let untouched: AssignmentPatch = serde_json::from_str(r#"{"completed":true}"#).unwrap();
        assignment.apply(&untouched).unwrap();
        assert_eq!(assignment.duration_override, Some(45));
        assert!(assignment.completed);

        let cleared: AssignmentPatch =
            serde_json::from_str(r#"{"durationOverride":null}"#).unwrap();
        assert_eq!(cleared.duration_override, Some(None));
        assignment.apply(&cleared).unwrap();
        assert_eq!(assignment.duration_override, None);

        let zero: AssignmentPatch = serde_json::from_str(r#"{"durationOverride":0}"#).unwrap();
        assert!(assignment.apply(&zero).is_err());
    }

    #[test]
    fn test_assignment_serialization_is_tagged() {
        let virtual_entry = Assignment::Virtual {
            task_id: 4,
            date_str: date("2026-03-02"),
        };
        let json = serde_json::to_value(&virtual_entry).unwrap();
        assert_eq!(json["kind"], "virtual");
        assert_eq!(json["taskId"], 4);
        assert_eq!(json["dateStr"], "2026-03-02");

        let persisted = Assignment::Persisted(TaskAssignment::new(9, 4, date("2026-03-02")));
        let json = serde_json::to_value(&persisted).unwrap();
        assert_eq!(json["kind"], "persisted");
        assert_eq!(json["id"], 9);
        assert!(!persisted.completed());
    }

    #[test]
    fn test_tracking_stats_average() {
        let record = |hours: f64, done: bool| TaskTracking {
            id: 0,
            assignment_id: 1,
            task_id: 2,
            hours_logged: hours,
            day_completed: done,
            total_hours: 0.0,
            recurring_days: None,
            completion_date: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stats = TrackingStats::from_records(2, &[record(1.0, true), record(2.0, false)]);
        assert_eq!(stats.total_instances, 2);
        assert_eq!(stats.days_completed, 1);
        assert!((stats.average_hours_per_day - 1.5).abs() < f64::EPSILON);

        let empty = TrackingStats::from_records(2, &[]);
        assert_eq!(empty.average_hours_per_day, 0.0);
    }
}
