//! SQLite database for persistent habit storage.
//!
//! This module owns every table of the application: task definitions,
//! their date assignments, rest days, day notes, tracking history and the
//! key/value config table. It is also the only place that knows how
//! recurring weekdays are encoded on disk.

use chrono::{NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::store::{
    is_expected_on, AssignmentPatch, DateRange, DayNote, DayOff, NewAssignment, NewTask,
    NewTracking, TaskAssignment, TaskDefinition, TaskId, TaskPatch, TaskTracking, TrackingPatch,
    TrackingStats, WeekdaySet, DEFAULT_TREND_DAYS,
};

/// Config key holding the first date the statistics window starts at.
pub const STATS_START_DATE_KEY: &str = "stats_start_date";

/// Config key holding the length of the trend window.
pub const TREND_DAYS_KEY: &str = "trend_days";

const DEFAULT_STATS_START_DATE: &str = "2026-01-01";

const TASK_COLUMNS: &str =
    "id, text, description, baseline_duration, is_recurring, recurring_days, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str =
    "id, task_id, date_str, duration_override, completed, logged_hours, created_at, updated_at";

const TRACKING_COLUMNS: &str = "id, assignment_id, task_id, hours_logged, day_completed, total_hours, recurring_days, completion_date, created_at, updated_at";

// Weekday sets are stored as a bitmask, Sunday in bit 0.
impl ToSql for WeekdaySet {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.bits())))
    }
}

impl FromSql for WeekdaySet {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let bits = value.as_i64()?;
        u8::try_from(bits)
            .map(WeekdaySet::from_bits)
            .map_err(|_| FromSqlError::OutOfRange(bits))
    }
}

/// Read-only view of everything the statistics engine needs for a window.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub tasks: Vec<TaskDefinition>,
    pub assignments: Vec<TaskAssignment>,
    pub rest_days: HashSet<NaiveDate>,
}

/// Statistics settings read from the config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSettings {
    pub start_date: NaiveDate,
    pub trend_days: u32,
}

/// Database handle. Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens or creates the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = ?path, "Opening database");

        let conn = Connection::open(path)?;

        // Enable WAL mode for better crash safety
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::with_connection(conn)
    }

    /// Opens an in-memory database (for tests and throwaway runs).
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Returns the default database path.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("habitlog")
            .join("habitlog.db")
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied
        // statement behind, so a poisoned guard is still usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Initializes the database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock();

        conn.execute_batch(
            r#"
            -- Reusable task templates
            CREATE TABLE IF NOT EXISTS task_definitions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                description TEXT,
                baseline_duration INTEGER NOT NULL CHECK (baseline_duration > 0),
                is_recurring BOOLEAN NOT NULL DEFAULT 0,
                recurring_days INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- One task on one date
            CREATE TABLE IF NOT EXISTS task_assignments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL REFERENCES task_definitions(id) ON DELETE CASCADE,
                date_str TEXT NOT NULL,
                duration_override INTEGER,
                completed BOOLEAN NOT NULL DEFAULT 0,
                logged_hours REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (task_id, date_str)
            );

            -- Rest days
            CREATE TABLE IF NOT EXISTS days_off (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date_str TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            -- Free-text notes per date
            CREATE TABLE IF NOT EXISTS day_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date_str TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Hours logged against assignments
            CREATE TABLE IF NOT EXISTS task_tracking (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                assignment_id INTEGER NOT NULL REFERENCES task_assignments(id) ON DELETE CASCADE,
                task_id INTEGER NOT NULL REFERENCES task_definitions(id) ON DELETE CASCADE,
                hours_logged REAL NOT NULL DEFAULT 0,
                day_completed BOOLEAN NOT NULL DEFAULT 0,
                total_hours REAL NOT NULL DEFAULT 0,
                recurring_days INTEGER,
                completion_date TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Configuration settings
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_assignments_date ON task_assignments(date_str);
            CREATE INDEX IF NOT EXISTS idx_tracking_task ON task_tracking(task_id);
            CREATE INDEX IF NOT EXISTS idx_tracking_assignment ON task_tracking(assignment_id);
            "#,
        )?;

        // Seed default config if empty
        let config_count: i64 = conn.query_row("SELECT COUNT(*) FROM config", [], |r| r.get(0))?;
        if config_count == 0 {
            let now = now();
            let default_trend_days = DEFAULT_TREND_DAYS.to_string();
            let defaults = [
                (
                    STATS_START_DATE_KEY,
                    DEFAULT_STATS_START_DATE,
                    "First date included in statistics (YYYY-MM-DD)",
                ),
                (
                    TREND_DAYS_KEY,
                    default_trend_days.as_str(),
                    "Number of days shown in the completion trend",
                ),
            ];

            for (key, value, description) in defaults {
                conn.execute(
                    "INSERT INTO config (key, value, description, updated_at) VALUES (?1, ?2, ?3, ?4)",
                    params![key, value, description, &now],
                )?;
            }

            tracing::info!("Added {} default config settings", defaults.len());
        }

        tracing::debug!("Database schema initialized");
        Ok(())
    }

    // === Task definitions ===

    /// Lists all task definitions, newest first.
    pub fn list_tasks(&self) -> Result<Vec<TaskDefinition>> {
        let conn = self.lock();
        query_tasks(&conn)
    }

    pub fn get_task(&self, id: TaskId) -> Result<TaskDefinition> {
        let conn = self.lock();
        fetch_task(&conn, id)
    }

    pub fn create_task(&self, new: &NewTask) -> Result<TaskDefinition> {
        new.validate()?;
        let conn = self.lock();
        let now = now();

        conn.execute(
            "INSERT INTO task_definitions (text, description, baseline_duration, is_recurring, recurring_days, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                new.text.trim(),
                new.description(),
                new.baseline_duration,
                new.is_recurring,
                new.recurring_days,
                &now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        tracing::info!(task_id = id, text = %new.text.trim(), "Created task definition");
        fetch_task(&conn, id)
    }

    /// Applies a partial update. Invalid results leave the row unchanged.
    pub fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<TaskDefinition> {
        let conn = self.lock();
        let mut task = fetch_task(&conn, id)?;
        task.apply(patch)?;
        task.text = task.text.trim().to_string();
        task.updated_at = now();

        conn.execute(
            "UPDATE task_definitions
             SET text = ?1, description = ?2, baseline_duration = ?3, is_recurring = ?4, recurring_days = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                task.text,
                task.description,
                task.baseline_duration,
                task.is_recurring,
                task.recurring_days,
                task.updated_at,
                id,
            ],
        )?;

        Ok(task)
    }

    /// Deletes a task definition together with its assignments and tracking.
    pub fn delete_task(&self, id: TaskId) -> Result<()> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM task_definitions WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("task {id}")));
        }
        tracing::info!(task_id = id, "Deleted task definition");
        Ok(())
    }

    // === Task assignments ===

    /// Assignments dated inside `range`, in date order.
    pub fn assignments_in_range(&self, range: DateRange) -> Result<Vec<TaskAssignment>> {
        let conn = self.lock();
        query_assignments_in_range(&conn, range)
    }

    /// Assignments on a single date, in creation order.
    pub fn assignments_on(&self, date: NaiveDate) -> Result<Vec<TaskAssignment>> {
        let conn = self.lock();
        query_assignments_on(&conn, date)
    }

    /// Assignments of one task, most recent date first.
    pub fn assignments_for_task(&self, task_id: TaskId) -> Result<Vec<TaskAssignment>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM task_assignments WHERE task_id = ?1 ORDER BY date_str DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![task_id], assignment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_assignment(&self, id: i64) -> Result<TaskAssignment> {
        let conn = self.lock();
        fetch_assignment(&conn, id)
    }

    /// Persists a new assignment.
    ///
    /// Fails with `NotFound` for an unknown task and `Conflict` when the
    /// task already has an assignment on that date.
    pub fn create_assignment(&self, new: &NewAssignment) -> Result<TaskAssignment> {
        new.validate()?;
        let conn = self.lock();
        insert_assignment(&conn, new)
    }

    pub fn update_assignment(&self, id: i64, patch: &AssignmentPatch) -> Result<TaskAssignment> {
        let conn = self.lock();
        let mut assignment = fetch_assignment(&conn, id)?;
        assignment.apply(patch)?;
        assignment.updated_at = now();
        write_assignment(&conn, &assignment)?;
        Ok(assignment)
    }

    pub fn delete_assignment(&self, id: i64) -> Result<()> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM task_assignments WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("assignment {id}")));
        }
        Ok(())
    }

    /// Turns a virtual occurrence into a stored one, applying `patch`.
    ///
    /// If the occurrence was already stored the patch is applied to it
    /// instead, so repeating the call is harmless.
    pub fn materialize_assignment(
        &self,
        task_id: TaskId,
        date: NaiveDate,
        patch: &AssignmentPatch,
    ) -> Result<TaskAssignment> {
        patch.validate()?;
        let conn = self.lock();

        match find_assignment(&conn, task_id, date)? {
            Some(mut assignment) => {
                assignment.apply(patch)?;
                assignment.updated_at = now();
                write_assignment(&conn, &assignment)?;
                Ok(assignment)
            }
            None => {
                let created = insert_assignment(
                    &conn,
                    &NewAssignment {
                        task_id,
                        date_str: date,
                        duration_override: patch.duration_override.flatten(),
                        logged_hours: patch.logged_hours.unwrap_or(0.0),
                        completed: patch.completed.unwrap_or(false),
                    },
                )?;
                tracing::debug!(task_id, date = %date, "Materialized virtual assignment");
                Ok(created)
            }
        }
    }

    /// Marks every task expected on `dates` as completed.
    ///
    /// Stored assignments are updated and recurring occurrences without a
    /// stored row are created as completed. Runs in one transaction.
    pub fn complete_days(&self, dates: &[NaiveDate]) -> Result<Vec<TaskAssignment>> {
        let dates: BTreeSet<NaiveDate> = dates.iter().copied().collect();
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let tasks = query_tasks(&tx)?;
        let now = now();
        let mut touched = Vec::new();

        for &date in &dates {
            let mut on_date = query_assignments_on(&tx, date)?;
            for assignment in &mut on_date {
                if !assignment.completed {
                    assignment.completed = true;
                    assignment.updated_at = now.clone();
                    write_assignment(&tx, assignment)?;
                }
            }

            for task in tasks.iter().filter(|t| is_expected_on(t, date)) {
                if on_date.iter().any(|a| a.task_id == task.id) {
                    continue;
                }
                let created = insert_assignment(
                    &tx,
                    &NewAssignment {
                        task_id: task.id,
                        date_str: date,
                        duration_override: None,
                        logged_hours: 0.0,
                        completed: true,
                    },
                )?;
                on_date.push(created);
            }

            touched.extend(on_date);
        }

        tx.commit()?;
        tracing::info!(
            days = dates.len(),
            assignments = touched.len(),
            "Completed days"
        );
        Ok(touched)
    }

    // === Rest days ===

    pub fn days_off_in_range(&self, range: DateRange) -> Result<Vec<DayOff>> {
        let conn = self.lock();
        query_days_off(&conn, range)
    }

    /// Marks `date` as a rest day. Marking twice is a no-op.
    pub fn mark_day_off(&self, date: NaiveDate) -> Result<DayOff> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO days_off (date_str, created_at) VALUES (?1, ?2)",
            params![date, now()],
        )?;
        Ok(conn.query_row(
            "SELECT id, date_str, created_at FROM days_off WHERE date_str = ?1",
            params![date],
            day_off_from_row,
        )?)
    }

    /// Removes a rest day mark. Returns whether one existed.
    pub fn unmark_day_off(&self, date: NaiveDate) -> Result<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM days_off WHERE date_str = ?1", params![date])?;
        Ok(deleted > 0)
    }

    // === Day notes ===

    pub fn notes_in_range(&self, range: DateRange) -> Result<Vec<DayNote>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, date_str, content, created_at, updated_at
             FROM day_notes WHERE date_str BETWEEN ?1 AND ?2 ORDER BY date_str ASC",
        )?;
        let rows = stmt.query_map(params![range.start, range.end], note_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn note_on(&self, date: NaiveDate) -> Result<Option<DayNote>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                "SELECT id, date_str, content, created_at, updated_at FROM day_notes WHERE date_str = ?1",
                params![date],
                note_from_row,
            )
            .optional()?)
    }

    /// Creates or overwrites the note for `date`.
    pub fn upsert_note(&self, date: NaiveDate, content: &str) -> Result<DayNote> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO day_notes (date_str, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(date_str) DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
            params![date, content, now()],
        )?;
        Ok(conn.query_row(
            "SELECT id, date_str, content, created_at, updated_at FROM day_notes WHERE date_str = ?1",
            params![date],
            note_from_row,
        )?)
    }

    /// Deletes the note for `date`. Returns whether one existed.
    pub fn delete_note(&self, date: NaiveDate) -> Result<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM day_notes WHERE date_str = ?1", params![date])?;
        Ok(deleted > 0)
    }

    // === Tracking history ===

    pub fn tracking_for_task(&self, task_id: TaskId) -> Result<Vec<TaskTracking>> {
        let conn = self.lock();
        query_tracking(&conn, "task_id", task_id)
    }

    pub fn tracking_for_assignment(&self, assignment_id: i64) -> Result<Vec<TaskTracking>> {
        let conn = self.lock();
        query_tracking(&conn, "assignment_id", assignment_id)
    }

    pub fn create_tracking(&self, new: &NewTracking) -> Result<TaskTracking> {
        new.validate()?;
        let conn = self.lock();
        fetch_task(&conn, new.task_id)?;
        fetch_assignment(&conn, new.assignment_id)?;

        let now = now();
        let completion_date = new.day_completed.then(|| now.clone());
        conn.execute(
            "INSERT INTO task_tracking (assignment_id, task_id, hours_logged, day_completed, total_hours, recurring_days, completion_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                new.assignment_id,
                new.task_id,
                new.hours_logged,
                new.day_completed,
                new.total_hours,
                new.recurring_days,
                completion_date,
                &now,
            ],
        )?;

        fetch_tracking(&conn, conn.last_insert_rowid())
    }

    pub fn update_tracking(&self, id: i64, patch: &TrackingPatch) -> Result<TaskTracking> {
        let conn = self.lock();
        let mut record = fetch_tracking(&conn, id)?;
        record.apply(patch, &now())?;

        conn.execute(
            "UPDATE task_tracking
             SET hours_logged = ?1, day_completed = ?2, total_hours = ?3, completion_date = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                record.hours_logged,
                record.day_completed,
                record.total_hours,
                record.completion_date,
                record.updated_at,
                id,
            ],
        )?;

        Ok(record)
    }

    /// Totals over the tracking history of one task.
    pub fn tracking_stats(&self, task_id: TaskId) -> Result<TrackingStats> {
        let records = self.tracking_for_task(task_id)?;
        Ok(TrackingStats::from_records(task_id, &records))
    }

    // === Statistics snapshot ===

    /// Reads tasks, assignments and rest days for `range` under one lock.
    pub fn snapshot(&self, range: DateRange) -> Result<Snapshot> {
        let conn = self.lock();
        Ok(Snapshot {
            tasks: query_tasks(&conn)?,
            assignments: query_assignments_in_range(&conn, range)?,
            rest_days: query_days_off(&conn, range)?
                .into_iter()
                .map(|d| d.date_str)
                .collect(),
        })
    }

    // === Config ===

    /// Gets a config value by key.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Updates an existing config value.
    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE config SET value = ?1, updated_at = ?2 WHERE key = ?3",
            params![value, now(), key],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("config key {key}")));
        }
        Ok(())
    }

    /// Gets all config settings as (key, value, description).
    pub fn get_all_config(&self) -> Result<Vec<(String, String, Option<String>)>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT key, value, description FROM config ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Statistics settings, falling back to defaults for unreadable values.
    pub fn stats_settings(&self) -> Result<StatsSettings> {
        let start_date = self
            .get_config(STATS_START_DATE_KEY)?
            .and_then(|v| match NaiveDate::parse_from_str(&v, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(e) => {
                    tracing::warn!(value = %v, ?e, "Invalid stats_start_date, using default");
                    None
                }
            })
            .or_else(|| NaiveDate::parse_from_str(DEFAULT_STATS_START_DATE, "%Y-%m-%d").ok())
            .ok_or_else(|| Error::Config("no usable stats start date".into()))?;

        let trend_days = self
            .get_config(TREND_DAYS_KEY)?
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_TREND_DAYS);

        Ok(StatsSettings {
            start_date,
            trend_days,
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<TaskDefinition> {
    Ok(TaskDefinition {
        id: row.get(0)?,
        text: row.get(1)?,
        description: row.get(2)?,
        baseline_duration: row.get(3)?,
        is_recurring: row.get(4)?,
        recurring_days: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<TaskAssignment> {
    Ok(TaskAssignment {
        id: row.get(0)?,
        task_id: row.get(1)?,
        date_str: row.get(2)?,
        duration_override: row.get(3)?,
        completed: row.get(4)?,
        logged_hours: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn day_off_from_row(row: &Row<'_>) -> rusqlite::Result<DayOff> {
    Ok(DayOff {
        id: row.get(0)?,
        date_str: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<DayNote> {
    Ok(DayNote {
        id: row.get(0)?,
        date_str: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn tracking_from_row(row: &Row<'_>) -> rusqlite::Result<TaskTracking> {
    Ok(TaskTracking {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        task_id: row.get(2)?,
        hours_logged: row.get(3)?,
        day_completed: row.get(4)?,
        total_hours: row.get(5)?,
        recurring_days: row.get(6)?,
        completion_date: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn query_tasks(conn: &Connection) -> Result<Vec<TaskDefinition>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM task_definitions ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([], task_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn fetch_task(conn: &Connection, id: TaskId) -> Result<TaskDefinition> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM task_definitions WHERE id = ?1"),
        params![id],
        task_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("task {id}")))
}

fn query_assignments_in_range(conn: &Connection, range: DateRange) -> Result<Vec<TaskAssignment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM task_assignments
         WHERE date_str BETWEEN ?1 AND ?2 ORDER BY date_str ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![range.start, range.end], assignment_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn query_assignments_on(conn: &Connection, date: NaiveDate) -> Result<Vec<TaskAssignment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM task_assignments WHERE date_str = ?1 ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![date], assignment_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn fetch_assignment(conn: &Connection, id: i64) -> Result<TaskAssignment> {
    conn.query_row(
        &format!("SELECT {ASSIGNMENT_COLUMNS} FROM task_assignments WHERE id = ?1"),
        params![id],
        assignment_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("assignment {id}")))
}

fn find_assignment(
    conn: &Connection,
    task_id: TaskId,
    date: NaiveDate,
) -> Result<Option<TaskAssignment>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {ASSIGNMENT_COLUMNS} FROM task_assignments WHERE task_id = ?1 AND date_str = ?2"
            ),
            params![task_id, date],
            assignment_from_row,
        )
        .optional()?)
}

fn insert_assignment(conn: &Connection, new: &NewAssignment) -> Result<TaskAssignment> {
    fetch_task(conn, new.task_id)?;
    if find_assignment(conn, new.task_id, new.date_str)?.is_some() {
        return Err(Error::Conflict(format!(
            "task {} is already assigned to {}",
            new.task_id, new.date_str
        )));
    }

    conn.execute(
        "INSERT INTO task_assignments (task_id, date_str, duration_override, completed, logged_hours, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            new.task_id,
            new.date_str,
            new.duration_override,
            new.completed,
            new.logged_hours,
            now(),
        ],
    )?;

    fetch_assignment(conn, conn.last_insert_rowid())
}

fn write_assignment(conn: &Connection, assignment: &TaskAssignment) -> Result<()> {
    conn.execute(
        "UPDATE task_assignments
         SET duration_override = ?1, completed = ?2, logged_hours = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            assignment.duration_override,
            assignment.completed,
            assignment.logged_hours,
            assignment.updated_at,
            assignment.id,
        ],
    )?;
    Ok(())
}

fn query_days_off(conn: &Connection, range: DateRange) -> Result<Vec<DayOff>> {
    let mut stmt = conn.prepare(
        "SELECT id, date_str, created_at FROM days_off
         WHERE date_str BETWEEN ?1 AND ?2 ORDER BY date_str ASC",
    )?;
    let rows = stmt.query_map(params![range.start, range.end], day_off_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn query_tracking(conn: &Connection, column: &str, id: i64) -> Result<Vec<TaskTracking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRACKING_COLUMNS} FROM task_tracking WHERE {column} = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![id], tracking_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn fetch_tracking(conn: &Connection, id: i64) -> Result<TaskTracking> {
    conn.query_row(
        &format!("SELECT {TRACKING_COLUMNS} FROM task_tracking WHERE id = ?1"),
        params![id],
        tracking_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("tracking record {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn new_task(text: &str, recurring_days: &[u8]) -> NewTask {
        NewTask {
            text: text.to_string(),
            description: None,
            baseline_duration: 30,
            is_recurring: !recurring_days.is_empty(),
            recurring_days: WeekdaySet::from_indices(recurring_days).unwrap(),
        }
    }

    fn assign(task_id: TaskId, day: &str) -> NewAssignment {
        NewAssignment {
            task_id,
            date_str: date(day),
            duration_override: None,
            logged_hours: 0.0,
            completed: false,
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.list_tasks().unwrap().is_empty());
        assert_eq!(db.get_all_config().unwrap().len(), 2);
    }

    #[test]
    fn test_task_round_trip_keeps_weekdays() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_task(&new_task("Gym", &[1, 3, 5])).unwrap();

        let fetched = db.get_task(created.id).unwrap();
        assert_eq!(fetched.text, "Gym");
        assert!(fetched.is_recurring);
        assert_eq!(fetched.recurring_days.iter().collect::<Vec<_>>(), vec![1, 3, 5]);

        let updated = db
            .update_task(
                created.id,
                &TaskPatch {
                    baseline_duration: Some(45),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.baseline_duration, 45);
        assert_eq!(db.get_task(created.id).unwrap().baseline_duration, 45);
    }

    #[test]
    fn test_invalid_task_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let mut body = new_task("Read", &[]);
        body.is_recurring = true;
        assert!(matches!(db.create_task(&body), Err(Error::Validation(_))));
        assert!(matches!(db.get_task(42), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete_task_cascades() {
        let db = Database::open_in_memory().unwrap();
        let task = db.create_task(&new_task("Read", &[])).unwrap();
        let assignment = db.create_assignment(&assign(task.id, "2026-03-02")).unwrap();
        db.create_tracking(&NewTracking {
            assignment_id: assignment.id,
            task_id: task.id,
            hours_logged: 1.0,
            day_completed: true,
            total_hours: 1.0,
            recurring_days: None,
        })
        .unwrap();

        db.delete_task(task.id).unwrap();

        assert!(db.assignments_for_task(task.id).unwrap().is_empty());
        assert!(db.tracking_for_task(task.id).unwrap().is_empty());
        assert!(matches!(db.delete_task(task.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_duplicate_assignment_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let task = db.create_task(&new_task("Read", &[])).unwrap();
        db.create_assignment(&assign(task.id, "2026-03-02")).unwrap();

        assert!(matches!(
            db.create_assignment(&assign(task.id, "2026-03-02")),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            db.create_assignment(&assign(999, "2026-03-02")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let task = db.create_task(&new_task("Read", &[0, 1, 2, 3, 4, 5, 6])).unwrap();
        let patch = AssignmentPatch {
            completed: Some(true),
            ..Default::default()
        };

        let first = db
            .materialize_assignment(task.id, date("2026-03-02"), &patch)
            .unwrap();
        let second = db
            .materialize_assignment(task.id, date("2026-03-02"), &patch)
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.completed);
        assert_eq!(db.assignments_on(date("2026-03-02")).unwrap().len(), 1);
    }

    #[test]
    fn test_complete_days_creates_and_updates() {
        let db = Database::open_in_memory().unwrap();
        // 2026-03-02 is a Monday
        let daily = db.create_task(&new_task("Read", &[0, 1, 2, 3, 4, 5, 6])).unwrap();
        let weekend = db.create_task(&new_task("Hike", &[0, 6])).unwrap();
        let one_off = db.create_task(&new_task("Dentist", &[])).unwrap();
        db.create_assignment(&assign(one_off.id, "2026-03-02")).unwrap();

        let touched = db
            .complete_days(&[date("2026-03-02"), date("2026-03-02")])
            .unwrap();

        assert_eq!(touched.len(), 2);
        assert!(touched.iter().all(|a| a.completed));
        let on_day = db.assignments_on(date("2026-03-02")).unwrap();
        assert!(on_day.iter().any(|a| a.task_id == daily.id && a.completed));
        assert!(on_day.iter().all(|a| a.task_id != weekend.id));
    }

    #[test]
    fn test_days_off_mark_and_unmark() {
        let db = Database::open_in_memory().unwrap();
        let first = db.mark_day_off(date("2026-03-03")).unwrap();
        let again = db.mark_day_off(date("2026-03-03")).unwrap();
        assert_eq!(first.id, again.id);

        let range = DateRange::new(date("2026-03-01"), date("2026-03-31"));
        assert_eq!(db.days_off_in_range(range).unwrap().len(), 1);

        assert!(db.unmark_day_off(date("2026-03-03")).unwrap());
        assert!(!db.unmark_day_off(date("2026-03-03")).unwrap());
    }

    #[test]
    fn test_note_upsert_overwrites() {
        let db = Database::open_in_memory().unwrap();
        let first = db.upsert_note(date("2026-03-03"), "tired").unwrap();
        let second = db.upsert_note(date("2026-03-03"), "").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.content, "");
        assert_eq!(
            db.note_on(date("2026-03-03")).unwrap().unwrap().content,
            ""
        );
        assert!(db.delete_note(date("2026-03-03")).unwrap());
        assert!(!db.delete_note(date("2026-03-03")).unwrap());
    }

    #[test]
    fn test_tracking_update_sets_completion_date() {
        let db = Database::open_in_memory().unwrap();
        let task = db.create_task(&new_task("Read", &[])).unwrap();
        let assignment = db.create_assignment(&assign(task.id, "2026-03-02")).unwrap();
        let record = db
            .create_tracking(&NewTracking {
                assignment_id: assignment.id,
                task_id: task.id,
                hours_logged: 0.5,
                day_completed: false,
                total_hours: 0.5,
                recurring_days: Some(WeekdaySet::ALL),
            })
            .unwrap();
        assert!(record.completion_date.is_none());
        assert_eq!(record.recurring_days, Some(WeekdaySet::ALL));

        let updated = db
            .update_tracking(
                record.id,
                &TrackingPatch {
                    day_completed: Some(true),
                    hours_logged: Some(1.5),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated.completion_date.is_some());

        let stats = db.tracking_stats(task.id).unwrap();
        assert_eq!(stats.total_instances, 1);
        assert_eq!(stats.days_completed, 1);
        assert_eq!(stats.total_hours, 1.5);
    }

    #[test]
    fn test_snapshot_is_limited_to_range() {
        let db = Database::open_in_memory().unwrap();
        let task = db.create_task(&new_task("Read", &[])).unwrap();
        db.create_assignment(&assign(task.id, "2026-03-02")).unwrap();
        db.create_assignment(&assign(task.id, "2026-04-02")).unwrap();
        db.mark_day_off(date("2026-03-05")).unwrap();
        db.mark_day_off(date("2026-04-05")).unwrap();

        let snapshot = db
            .snapshot(DateRange::new(date("2026-03-01"), date("2026-03-31")))
            .unwrap();

        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.assignments.len(), 1);
        assert!(snapshot.rest_days.contains(&date("2026-03-05")));
        assert_eq!(snapshot.rest_days.len(), 1);
    }

    #[test]
    fn test_stats_settings_fall_back_on_bad_values() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(
            db.stats_settings().unwrap(),
            StatsSettings {
                start_date: date("2026-01-01"),
                trend_days: 30
            }
        );

        db.set_config(TREND_DAYS_KEY, "lots").unwrap();
        db.set_config(STATS_START_DATE_KEY, "2026-02-01").unwrap();
        let settings = db.stats_settings().unwrap();
        assert_eq!(settings.trend_days, 30);
        assert_eq!(settings.start_date, date("2026-02-01"));

        assert!(matches!(
            db.set_config("unknown", "1"),
            Err(Error::NotFound(_))
        ));
    }
}
