use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opaque unique identifier of a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh `task-<uuid>` identifier.
    pub fn generate() -> Self {
        Self(format!("task-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form used in tables: the first 8 characters after the `task-` prefix.
    pub fn short(&self) -> &str {
        let s = self.0.strip_prefix("task-").unwrap_or(&self.0);
        match s.char_indices().nth(8) {
            Some((i, _)) => &s[..i],
            None => s,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Partition key for schedule entries.
///
/// Either a weekday label (`"MON"`) or a full calendar date (`"2025-03-24"`).
/// The scheduler treats it as an opaque string; [`Day::date`] recovers the
/// date when there is one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Day(String);

impl Day {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format("%Y-%m-%d").to_string())
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, "%Y-%m-%d").ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Day {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Priority level of a task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    #[default]
    None,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::High, Priority::Medium, Priority::Low, Priority::None];

    /// Color tag a task gets when none is set explicitly.
    pub fn default_color(self) -> &'static str {
        match self {
            Priority::Low => "green",
            Priority::Medium => "yellow",
            Priority::High => "red",
            Priority::None => "gray",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::None => "none",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "l" => Ok(Priority::Low),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            "none" | "" => Ok(Priority::None),
            other => Err(format!("unknown priority '{}' (expected low, medium, high or none)", other)),
        }
    }
}

/// A content record describing work to be done, independent of scheduling.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: TaskId,
    /// Short title shown on cards and in the timetable.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub priority: Priority,
    /// Display color tag. Defaults to the priority's color.
    pub color: String,
    /// Optional grouping tag (e.g. "home", "school", "work").
    #[serde(default)]
    pub category: Option<String>,
    /// Timestamp when the task was created (RFC 3339).
    pub created_at: String,
}

/// Input for creating a task.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    /// Caller-chosen id; generated when absent.
    pub id: Option<TaskId>,
    pub title: String,
    pub details: String,
    pub priority: Priority,
    pub color: Option<String>,
    pub category: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(TaskId::new(id));
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Partial update of a task's content. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub details: Option<String>,
    pub priority: Option<Priority>,
    pub color: Option<String>,
    /// `Some("")` clears the category.
    pub category: Option<String>,
}

/// Display fields that may be overwritten when a task is placed or moved.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub title: Option<String>,
    pub details: Option<String>,
    pub priority: Option<Priority>,
    pub color: Option<String>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.details.is_none() && self.priority.is_none() && self.color.is_none()
    }
}

/// Placement of exactly one task onto a day and a half-open hour interval.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub task_id: TaskId,
    pub day: Day,
    /// Hours since day start, fractional to the minute.
    pub start_hour: f64,
    /// Always greater than `start_hour`.
    pub end_hour: f64,
    /// Copied from the task at placement time.
    pub category: Option<String>,
    pub title: String,
    pub details: String,
    pub priority: Priority,
    pub color: String,
}

impl ScheduleEntry {
    pub fn duration(&self) -> f64 {
        self.end_hour - self.start_hour
    }

    /// Half-open overlap test against `[start, end)`. Touching ends do not overlap.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start_hour < end && start < self.end_hour
    }
}
