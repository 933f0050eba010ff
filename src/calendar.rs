//! The scheduler wired to its task store.
//!
//! [`Calendar`] owns a [`Scheduler`] and a [`TaskStore`]. Scheduler operations
//! decide what happens; once one is accepted the matching store call is made.
//! Store failures are logged and swallowed so they never undo or block an
//! accepted operation.

use tracing::{debug, warn};

use crate::models::{Day, Overrides, Task, TaskDraft, TaskEdit, TaskId};
use crate::scheduler::{Placement, ScheduleError, Scheduler, SchedulerSettings};
use crate::storage::{StoreError, TaskRow, TaskStore};
use crate::timefmt::{format_range, parse_range};

pub struct Calendar {
    scheduler: Scheduler,
    store: TaskStore,
}

impl Calendar {
    /// Loads every row from the store and rebuilds the schedule.
    ///
    /// Rows with a readable `day` and `time_range` are placed in file order.
    /// Rows that are malformed or collide with an earlier placement stay in the
    /// unscheduled pool, and their schedule columns are cleared.
    pub fn open(store: TaskStore, settings: SchedulerSettings) -> Result<Self, StoreError> {
        let rows = store.list()?;
        let mut scheduler = Scheduler::new(settings);
        let mut rejected = Vec::new();

        for row in &rows {
            let task = row.to_task();
            let id = task.id.clone();
            if let Err(e) = scheduler.insert_task(task) {
                warn!(task_id = %row.id, error = %e, "skipping stored task");
                continue;
            }
            let (Some(day), Some(range)) = (row.day.as_deref(), row.time_range.as_deref()) else {
                continue;
            };
            let placed = parse_range(range)
                .map_err(|e| e.to_string())
                .and_then(|(start, end)| {
                    scheduler
                        .place(&id, &Day::new(day), start, end, None)
                        .map_err(|e| e.to_string())
                });
            if let Err(e) = placed {
                warn!(task_id = %row.id, %day, range, error = %e, "stored placement left unscheduled");
                rejected.push(id);
            }
        }

        debug!(path = %store.path().display(), tasks = scheduler.len(), "calendar loaded");
        let calendar = Self { scheduler, store };
        // Cleared so a later open cannot revive a placement the model refused.
        for id in &rejected {
            calendar.sync_schedule(id);
        }
        Ok(calendar)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn resolve(&self, query: &str) -> Result<TaskId, ScheduleError> {
        self.scheduler.resolve(query)
    }

    pub fn add_task(&mut self, draft: TaskDraft) -> Result<TaskId, ScheduleError> {
        let id = self.scheduler.add_task(draft)?;
        if let Some(task) = self.scheduler.task(&id) {
            let row = TaskRow::from_task(task, None);
            self.sync("create", &id, self.store.create(row).map(drop));
        }
        Ok(id)
    }

    pub fn edit_task(&mut self, id: &TaskId, edit: TaskEdit) -> Result<Task, ScheduleError> {
        let task = self.scheduler.edit_task(id, edit)?.clone();
        let row = TaskRow::from_task(&task, None);
        self.sync("update", id, self.store.update(&row));
        Ok(task)
    }

    pub fn delete_task(&mut self, id: &TaskId) -> Result<Task, ScheduleError> {
        let task = self.scheduler.delete_task(id)?;
        self.sync("delete", id, self.store.delete(id.as_str()));
        Ok(task)
    }

    pub fn place(
        &mut self,
        id: &TaskId,
        day: &Day,
        start: f64,
        end: f64,
        overrides: Option<&Overrides>,
    ) -> Result<Placement, ScheduleError> {
        let outcome = self.scheduler.place(id, day, start, end, overrides)?;
        if overrides.is_some_and(|o| !o.is_empty()) {
            if let Some(task) = self.scheduler.task(id) {
                let row = TaskRow::from_task(task, None);
                self.sync("update", id, self.store.update(&row));
            }
        }
        self.sync_schedule(id);
        Ok(outcome)
    }

    pub fn resize(&mut self, id: &TaskId, new_end: f64) -> Result<f64, ScheduleError> {
        let end = self.scheduler.resize(id, new_end)?;
        self.sync_schedule(id);
        Ok(end)
    }

    /// Returns the task to the pool. Never fails; see [`Scheduler::retract`].
    pub fn retract(&mut self, id: &TaskId) -> bool {
        let removed = self.scheduler.retract(id).is_some();
        if removed {
            self.sync_schedule(id);
        }
        removed
    }

    /// Deletes every task and the database file.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.store.reset()?;
        self.scheduler = Scheduler::new(*self.scheduler.settings());
        Ok(())
    }

    fn sync_schedule(&self, id: &TaskId) {
        let (day, range) = match self.scheduler.entry(id) {
            Some(e) => (Some(e.day.to_string()), Some(format_range(e.start_hour, e.end_hour))),
            None => (None, None),
        };
        let result = self
            .store
            .update_schedule(id.as_str(), day.as_deref(), range.as_deref());
        self.sync("schedule", id, result);
    }

    fn sync(&self, op: &str, id: &TaskId, result: Result<(), StoreError>) {
        if let Err(e) = result {
            warn!(op, task_id = %id, error = %e, "task store update failed");
        }
    }
}
