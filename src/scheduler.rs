//! Interval-based timetable scheduler.
//!
//! Holds the task collection, the unscheduled pool, and the schedule entries
//! partitioned by [`Day`]. Within a day entries are kept sorted by start hour
//! and never overlap: for any two entries `a`, `b` on the same day,
//! `!(a.start < b.end && b.start < a.end)`. Every operation either applies
//! fully or leaves the model untouched.

use std::collections::{BTreeMap, HashMap};

use chrono::Local;
use thiserror::Error;
use tracing::debug;

use crate::models::{Day, Overrides, ScheduleEntry, Task, TaskDraft, TaskEdit, TaskId};
use crate::slots::Slots;
use crate::timefmt::round_to_minute;

/// Errors returned by scheduler operations. None of them leave partial state.
#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    /// The requested interval overlaps another entry on the same day.
    #[error("slot occupied on {day} at hour {hour} by {occupant}")]
    SlotOccupied {
        day: Day,
        /// Requested start hour, for highlighting the rejected cell.
        hour: f64,
        occupant: TaskId,
    },
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),
    #[error("task {0} is not scheduled")]
    NotScheduled(TaskId),
    /// Growing the entry would swallow the start of another entry.
    #[error("cannot resize {task_id}: {blocker} starts inside the new range")]
    ResizeBlocked { task_id: TaskId, blocker: TaskId },
    #[error("invalid interval [{start}, {end})")]
    InvalidInterval { start: f64, end: f64 },
    #[error("task {0} already exists")]
    DuplicateTask(TaskId),
    #[error("task title cannot be empty")]
    EmptyTitle,
    #[error("'{0}' matches more than one task")]
    AmbiguousTask(String),
}

/// Tunables of the scheduling model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerSettings {
    /// Minimum entry duration in hours, enforced by resize clamping.
    pub granularity: f64,
    /// First hour marker of the visible range.
    pub first_hour: u32,
    /// Last hour marker of the visible range; the range ends one hour later.
    pub last_hour: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { granularity: 1.0, first_hour: 1, last_hour: 24 }
    }
}

impl SchedulerSettings {
    pub fn visible_start(&self) -> f64 {
        f64::from(self.first_hour)
    }

    pub fn visible_end(&self) -> f64 {
        f64::from(self.last_hour) + 1.0
    }
}

/// Outcome of an accepted [`Scheduler::place`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The task left the unscheduled pool.
    Created,
    /// An existing entry was relocated.
    Moved,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    settings: SchedulerSettings,
    tasks: HashMap<TaskId, Task>,
    /// All task ids in insertion order.
    order: Vec<TaskId>,
    /// Unscheduled task ids; retracted tasks are appended at the end.
    pool: Vec<TaskId>,
    entries: BTreeMap<Day, Vec<ScheduleEntry>>,
    placed: HashMap<TaskId, Day>,
}

impl Scheduler {
    pub fn new(settings: SchedulerSettings) -> Self {
        Self { settings, ..Self::default() }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    // ---------------------------------------------------------------------
    // Task collection
    // ---------------------------------------------------------------------

    /// Creates a task from a draft and puts it in the unscheduled pool.
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<TaskId, ScheduleError> {
        let id = draft.id.unwrap_or_else(TaskId::generate);
        let color = draft
            .color
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| draft.priority.default_color().to_string());
        let task = Task {
            id: id.clone(),
            title: draft.title.trim().to_string(),
            details: draft.details,
            priority: draft.priority,
            color,
            category: draft.category.filter(|c| !c.trim().is_empty()),
            created_at: Local::now().to_rfc3339(),
        };
        self.insert_task(task)?;
        Ok(id)
    }

    /// Inserts an already-built task (e.g. loaded from storage) as unscheduled.
    pub fn insert_task(&mut self, task: Task) -> Result<(), ScheduleError> {
        if task.title.trim().is_empty() {
            return Err(ScheduleError::EmptyTitle);
        }
        if self.tasks.contains_key(&task.id) {
            return Err(ScheduleError::DuplicateTask(task.id));
        }
        debug!(task_id = %task.id, title = %task.title, "task added");
        self.order.push(task.id.clone());
        self.pool.push(task.id.clone());
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Applies a content edit. A scheduled task's entry follows the new values.
    ///
    /// When the priority changes and the color was still the old priority's
    /// default, the color follows the new priority.
    pub fn edit_task(&mut self, id: &TaskId, edit: TaskEdit) -> Result<&Task, ScheduleError> {
        if matches!(&edit.title, Some(t) if t.trim().is_empty()) {
            return Err(ScheduleError::EmptyTitle);
        }
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| ScheduleError::UnknownTask(id.clone()))?;

        if let Some(t) = edit.title {
            task.title = t.trim().to_string();
        }
        if let Some(d) = edit.details {
            task.details = d;
        }
        if let Some(p) = edit.priority {
            if edit.color.is_none() && task.color == task.priority.default_color() {
                task.color = p.default_color().to_string();
            }
            task.priority = p;
        }
        if let Some(c) = edit.color.filter(|c| !c.trim().is_empty()) {
            task.color = c;
        }
        if let Some(c) = edit.category {
            task.category = if c.trim().is_empty() { None } else { Some(c) };
        }

        self.refresh_entry(id);
        debug!(task_id = %id, "task edited");
        self.tasks
            .get(id)
            .ok_or_else(|| ScheduleError::UnknownTask(id.clone()))
    }

    /// Removes a task together with its placement.
    pub fn delete_task(&mut self, id: &TaskId) -> Result<Task, ScheduleError> {
        let task = self
            .tasks
            .remove(id)
            .ok_or_else(|| ScheduleError::UnknownTask(id.clone()))?;
        self.take_entry(id);
        self.pool.retain(|t| t != id);
        self.order.retain(|t| t != id);
        debug!(task_id = %id, "task deleted");
        Ok(task)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Tasks without a placement, in pool order.
    pub fn unscheduled(&self) -> impl Iterator<Item = &Task> {
        self.pool.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_scheduled(&self, id: &TaskId) -> bool {
        self.placed.contains_key(id)
    }

    /// Resolves a full id or a unique id prefix (with or without `task-`).
    ///
    /// A blank query never matches.
    pub fn resolve(&self, query: &str) -> Result<TaskId, ScheduleError> {
        let query = query.trim();
        let exact = TaskId::new(query);
        if query.is_empty() {
            return Err(ScheduleError::UnknownTask(exact));
        }
        if self.tasks.contains_key(&exact) {
            return Ok(exact);
        }
        let mut matches = self
            .order
            .iter()
            .filter(|id| id.as_str().starts_with(query) || id.short().starts_with(query));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id.clone()),
            (Some(_), Some(_)) => Err(ScheduleError::AmbiguousTask(query.to_string())),
            (None, _) => Err(ScheduleError::UnknownTask(exact)),
        }
    }

    // ---------------------------------------------------------------------
    // Schedule
    // ---------------------------------------------------------------------

    /// Places or moves `task_id` onto `[start, end)` of `day`.
    ///
    /// Hours are rounded to the minute. The task's own current entry is
    /// ignored by the conflict scan, which is what makes moves work. Touching
    /// intervals are allowed. `day` is expected to be one of the visible days;
    /// that is checked by the caller.
    pub fn place(
        &mut self,
        task_id: &TaskId,
        day: &Day,
        start: f64,
        end: f64,
        overrides: Option<&Overrides>,
    ) -> Result<Placement, ScheduleError> {
        if !self.tasks.contains_key(task_id) {
            return Err(ScheduleError::UnknownTask(task_id.clone()));
        }
        let (start, end) = validate_interval(start, end)?;

        if let Some(occupant) = self.find_conflict(day, start, end, Some(task_id)) {
            debug!(task_id = %task_id, %day, start, end, occupant = %occupant.task_id, "placement rejected");
            return Err(ScheduleError::SlotOccupied {
                day: day.clone(),
                hour: start,
                occupant: occupant.task_id.clone(),
            });
        }

        if let Some(o) = overrides {
            self.apply_overrides(task_id, o);
        }

        let outcome = match self.take_entry(task_id) {
            Some(mut entry) => {
                entry.day = day.clone();
                entry.start_hour = start;
                entry.end_hour = end;
                self.insert_entry(entry);
                self.refresh_entry(task_id);
                Placement::Moved
            }
            None => {
                let Some(task) = self.tasks.get(task_id) else {
                    return Err(ScheduleError::UnknownTask(task_id.clone()));
                };
                let entry = ScheduleEntry {
                    task_id: task_id.clone(),
                    day: day.clone(),
                    start_hour: start,
                    end_hour: end,
                    category: task.category.clone(),
                    title: task.title.clone(),
                    details: task.details.clone(),
                    priority: task.priority,
                    color: task.color.clone(),
                };
                self.pool.retain(|id| id != task_id);
                self.insert_entry(entry);
                Placement::Created
            }
        };
        debug!(task_id = %task_id, %day, start, end, ?outcome, "task placed");
        Ok(outcome)
    }

    /// Moves the end of a scheduled entry, keeping its start.
    ///
    /// The new end is clamped to at least `start + granularity`. The resize is
    /// rejected when another entry on the same day starts strictly inside
    /// `(start, new_end)`. Returns the effective end hour.
    pub fn resize(&mut self, task_id: &TaskId, new_end: f64) -> Result<f64, ScheduleError> {
        if !self.tasks.contains_key(task_id) {
            return Err(ScheduleError::UnknownTask(task_id.clone()));
        }
        let (day, start) = match self.entry(task_id) {
            Some(e) => (e.day.clone(), e.start_hour),
            None => return Err(ScheduleError::NotScheduled(task_id.clone())),
        };
        if !new_end.is_finite() {
            return Err(ScheduleError::InvalidInterval { start, end: new_end });
        }
        let end = round_to_minute(new_end.max(start + self.settings.granularity));

        if let Some(blocker) = self
            .entries_on(&day)
            .iter()
            .find(|e| e.task_id != *task_id && e.start_hour > start && e.start_hour < end)
        {
            debug!(task_id = %task_id, end, blocker = %blocker.task_id, "resize rejected");
            return Err(ScheduleError::ResizeBlocked {
                task_id: task_id.clone(),
                blocker: blocker.task_id.clone(),
            });
        }

        if let Some(entry) = self
            .entries
            .get_mut(&day)
            .and_then(|v| v.iter_mut().find(|e| e.task_id == *task_id))
        {
            entry.end_hour = end;
        }
        debug!(task_id = %task_id, end, "task resized");
        Ok(end)
    }

    /// Returns a task to the unscheduled pool.
    ///
    /// Unknown and unscheduled tasks are a no-op, so calling this twice is the
    /// same as calling it once. Returns the removed entry, if any.
    pub fn retract(&mut self, task_id: &TaskId) -> Option<ScheduleEntry> {
        let entry = self.take_entry(task_id)?;
        self.pool.push(task_id.clone());
        debug!(task_id = %task_id, day = %entry.day, "task retracted");
        Some(entry)
    }

    pub fn entry(&self, task_id: &TaskId) -> Option<&ScheduleEntry> {
        let day = self.placed.get(task_id)?;
        self.entries.get(day)?.iter().find(|e| e.task_id == *task_id)
    }

    /// Entries of one day sorted by start hour.
    pub fn entries_on(&self, day: &Day) -> &[ScheduleEntry] {
        self.entries.get(day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries of one day, optionally restricted to a category.
    pub fn entries_in<'a>(
        &'a self,
        day: &Day,
        category: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ScheduleEntry> + 'a {
        self.entries_on(day)
            .iter()
            .filter(move |e| category.is_none() || e.category.as_deref() == category)
    }

    /// All entries, grouped by day in key order.
    pub fn all_entries(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.values().flatten()
    }

    /// First entry other than `exclude` that overlaps `[start, end)` on `day`.
    pub fn find_conflict(
        &self,
        day: &Day,
        start: f64,
        end: f64,
        exclude: Option<&TaskId>,
    ) -> Option<&ScheduleEntry> {
        self.entries_on(day)
            .iter()
            .find(|e| Some(&e.task_id) != exclude && e.overlaps(start, end))
    }

    /// Renderable projection of a day over the visible hour range.
    pub fn compute_slots(&self, day: &Day) -> Slots<'_> {
        Slots::new(
            self.entries_on(day),
            self.settings.visible_start(),
            self.settings.visible_end(),
        )
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn insert_entry(&mut self, entry: ScheduleEntry) {
        self.placed.insert(entry.task_id.clone(), entry.day.clone());
        let day = self.entries.entry(entry.day.clone()).or_default();
        let pos = day.partition_point(|e| e.start_hour < entry.start_hour);
        day.insert(pos, entry);
    }

    fn take_entry(&mut self, task_id: &TaskId) -> Option<ScheduleEntry> {
        let day = self.placed.remove(task_id)?;
        let list = self.entries.get_mut(&day)?;
        let pos = list.iter().position(|e| e.task_id == *task_id)?;
        let entry = list.remove(pos);
        if list.is_empty() {
            self.entries.remove(&day);
        }
        Some(entry)
    }

    fn apply_overrides(&mut self, task_id: &TaskId, overrides: &Overrides) {
        let Some(task) = self.tasks.get_mut(task_id) else {
            return;
        };
        if let Some(t) = overrides.title.as_ref().filter(|t| !t.trim().is_empty()) {
            task.title = t.trim().to_string();
        }
        if let Some(d) = &overrides.details {
            task.details = d.clone();
        }
        if let Some(p) = overrides.priority {
            task.priority = p;
        }
        if let Some(c) = overrides.color.as_ref().filter(|c| !c.trim().is_empty()) {
            task.color = c.clone();
        }
    }

    /// Copies the task's display fields onto its entry.
    fn refresh_entry(&mut self, task_id: &TaskId) {
        let (Some(task), Some(day)) = (self.tasks.get(task_id), self.placed.get(task_id)) else {
            return;
        };
        if let Some(entry) = self
            .entries
            .get_mut(day)
            .and_then(|v| v.iter_mut().find(|e| e.task_id == *task_id))
        {
            entry.title = task.title.clone();
            entry.details = task.details.clone();
            entry.priority = task.priority;
            entry.color = task.color.clone();
            entry.category = task.category.clone();
        }
    }
}

fn validate_interval(start: f64, end: f64) -> Result<(f64, f64), ScheduleError> {
    if !start.is_finite() || !end.is_finite() {
        return Err(ScheduleError::InvalidInterval { start, end });
    }
    let (s, e) = (round_to_minute(start), round_to_minute(end));
    if s >= e {
        return Err(ScheduleError::InvalidInterval { start, end });
    }
    Ok((s, e))
}
