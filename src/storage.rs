use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Priority, ScheduleEntry, Task, TaskId};
use crate::timefmt::format_range;

/// Errors raised by the task store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt task database: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("field '{0}' is required")]
    MissingField(&'static str),
    #[error("task {0} not found")]
    NotFound(String),
    #[error("task {0} already exists")]
    DuplicateId(String),
}

/// A flat task row as persisted: task content plus the two schedule columns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    #[serde(default)]
    pub details: String,
    pub color: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Day key of the placement, if scheduled.
    #[serde(default)]
    pub day: Option<String>,
    /// `HH:MM-HH:MM`, if scheduled.
    #[serde(default)]
    pub time_range: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl TaskRow {
    /// Builds a row from a task and its current placement.
    pub fn from_task(task: &Task, entry: Option<&ScheduleEntry>) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            priority: task.priority,
            details: task.details.clone(),
            color: task.color.clone(),
            category: task.category.clone(),
            day: entry.map(|e| e.day.to_string()),
            time_range: entry.map(|e| format_range(e.start_hour, e.end_hour)),
            created_at: task.created_at.clone(),
        }
    }

    pub fn to_task(&self) -> Task {
        Task {
            id: TaskId::new(self.id.clone()),
            title: self.title.clone(),
            details: self.details.clone(),
            priority: self.priority,
            color: self.color.clone(),
            category: self.category.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

/// Returns the default path of the task database (`tasks.json`).
///
/// The path is determined in the following order:
/// 1. `TYMEPACE_DB` environment variable.
/// 2. `~/.local/share/tymepace/tasks.json` (on Linux).
/// 3. `./tasks.json` (fallback).
pub fn default_db_path() -> PathBuf {
    std::env::var("TYMEPACE_DB").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("tymepace");
        p.push("tasks.json");
        p
    })
}

/// JSON file store holding one flat table of task rows.
///
/// Operations mirror a REST task resource:
/// list (GET), create (POST), delete (DELETE) and schedule update (PUT).
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all rows. A missing file is an empty table.
    pub fn list(&self) -> Result<Vec<TaskRow>, StoreError> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&s)?)
    }

    /// Inserts a new row and echoes it back.
    ///
    /// Title and color are required; the id must be unique.
    pub fn create(&self, row: TaskRow) -> Result<TaskRow, StoreError> {
        if row.id.trim().is_empty() {
            return Err(StoreError::MissingField("id"));
        }
        if row.title.trim().is_empty() {
            return Err(StoreError::MissingField("title"));
        }
        if row.color.trim().is_empty() {
            return Err(StoreError::MissingField("color"));
        }
        let mut rows = self.list()?;
        if rows.iter().any(|r| r.id == row.id) {
            return Err(StoreError::DuplicateId(row.id));
        }
        rows.push(row.clone());
        self.save(&rows)?;
        Ok(row)
    }

    /// Replaces the content columns of an existing row, keeping its schedule.
    pub fn update(&self, row: &TaskRow) -> Result<(), StoreError> {
        let mut rows = self.list()?;
        let existing = rows
            .iter_mut()
            .find(|r| r.id == row.id)
            .ok_or_else(|| StoreError::NotFound(row.id.clone()))?;
        existing.title = row.title.clone();
        existing.priority = row.priority;
        existing.details = row.details.clone();
        existing.color = row.color.clone();
        existing.category = row.category.clone();
        self.save(&rows)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        if id.trim().is_empty() {
            return Err(StoreError::MissingField("id"));
        }
        let mut rows = self.list()?;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.save(&rows)
    }

    /// Sets (or clears, with `None`) the schedule columns of a row.
    pub fn update_schedule(
        &self,
        id: &str,
        day: Option<&str>,
        time_range: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut rows = self.list()?;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        row.day = day.map(str::to_string);
        row.time_range = time_range.map(str::to_string);
        self.save(&rows)
    }

    /// Deletes the database file.
    pub fn reset(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// Overwrites the file with the given rows.
    pub fn save(&self, rows: &[TaskRow]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let s = serde_json::to_string_pretty(rows)?;
        fs::write(&self.path, s).map_err(|e| self.io_err(e))
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}
