use std::time::{Duration, Instant};

use chrono::{Local, Timelike};
use ratatui::widgets::TableState;
use tracing::warn;

use crate::calendar::Calendar;
use crate::days::DayWindow;
use crate::models::{Day, Priority, ScheduleEntry, Task, TaskDraft, TaskEdit, TaskId};
use crate::scheduler::ScheduleError;
use crate::timefmt::format_hhmm;

/// How long a rejection message stays on screen.
pub const FLASH_DURATION: Duration = Duration::from_millis(2500);

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Focus {
    Inbox,
    Grid,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum InputField {
    None,
    Title,
    Details,
    Category,
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub title: String,
    pub details: String,
    pub priority: Priority,
    pub step: usize, // 0: Title, 1: Details, 2: Priority, 3: Category
}

/// Transient message, optionally pointing at a rejected cell.
#[derive(Debug, Clone)]
pub struct Flash {
    pub message: String,
    pub cell: Option<(Day, f64)>,
    pub until: Instant,
}

/// What one hour row of a day column shows.
#[derive(Debug, Clone, PartialEq)]
pub enum GridCell {
    Free,
    /// An entry starts in this hour; `more` counts further entries starting
    /// in the same hour.
    Starts { entry: ScheduleEntry, more: usize },
    /// Covered by an entry that started in an earlier hour.
    Continues(ScheduleEntry),
}

pub struct App {
    pub calendar: Calendar,
    pub window: DayWindow,
    pub focus: Focus,
    /// Snapshot of the unscheduled pool.
    pub inbox: Vec<Task>,
    pub inbox_state: TableState,
    pub cursor_day: usize,
    pub cursor_hour: u32,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<TaskId>,
    pub add_state: AddState,
    pub flash: Option<Flash>,
    /// Entry picked up for a move.
    pub holding: Option<TaskId>,
    pub category_filter: Option<String>,
}

impl App {
    pub fn new(calendar: Calendar, window: DayWindow) -> App {
        let first_hour = calendar.scheduler().settings().first_hour;
        let mut app = App {
            calendar,
            window,
            focus: Focus::Inbox,
            inbox: Vec::new(),
            inbox_state: TableState::default(),
            cursor_day: 0,
            cursor_hour: first_hour,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            flash: None,
            holding: None,
            category_filter: None,
        };
        app.set_cursor_hour(Local::now().hour());
        app.reload();
        app
    }

    /// Refreshes the inbox snapshot and clamps selections.
    pub fn reload(&mut self) {
        let filter = self.category_filter.clone();
        self.inbox = self
            .calendar
            .scheduler()
            .unscheduled()
            .filter(|t| filter.is_none() || t.category == filter)
            .cloned()
            .collect();

        if self.inbox.is_empty() {
            self.inbox_state.select(None);
        } else if let Some(i) = self.inbox_state.selected() {
            if i >= self.inbox.len() {
                self.inbox_state.select(Some(self.inbox.len() - 1));
            }
        } else {
            self.inbox_state.select(Some(0));
        }

        let days = self.window.span.days() as usize;
        if self.cursor_day >= days {
            self.cursor_day = days - 1;
        }
        if self
            .holding
            .as_ref()
            .is_some_and(|id| !self.calendar.scheduler().is_scheduled(id))
        {
            self.holding = None;
        }
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Inbox => Focus::Grid,
            Focus::Grid => Focus::Inbox,
        };
    }

    /// Down in the inbox, or one hour later in the grid.
    pub fn next(&mut self) {
        match self.focus {
            Focus::Inbox => {
                if self.inbox.is_empty() { return; }
                let i = match self.inbox_state.selected() {
                    Some(i) if i + 1 < self.inbox.len() => i + 1,
                    _ => 0,
                };
                self.inbox_state.select(Some(i));
            }
            Focus::Grid => self.set_cursor_hour(self.cursor_hour + 1),
        }
    }

    /// Up in the inbox, or one hour earlier in the grid.
    pub fn previous(&mut self) {
        match self.focus {
            Focus::Inbox => {
                if self.inbox.is_empty() { return; }
                let i = match self.inbox_state.selected() {
                    Some(0) | None => self.inbox.len() - 1,
                    Some(i) => i - 1,
                };
                self.inbox_state.select(Some(i));
            }
            Focus::Grid => self.set_cursor_hour(self.cursor_hour.saturating_sub(1)),
        }
    }

    pub fn left(&mut self) {
        if self.cursor_day > 0 {
            self.cursor_day -= 1;
        } else {
            self.window = self.window.previous();
            self.cursor_day = self.window.span.days() as usize - 1;
        }
    }

    pub fn right(&mut self) {
        if self.cursor_day + 1 < self.window.span.days() as usize {
            self.cursor_day += 1;
        } else {
            self.window = self.window.next();
            self.cursor_day = 0;
        }
    }

    pub fn next_window(&mut self) {
        self.window = self.window.next();
    }

    pub fn previous_window(&mut self) {
        self.window = self.window.previous();
    }

    /// Cycles the window between 1, 3 and 7 days.
    pub fn cycle_span(&mut self) {
        self.window = self.window.with_span(self.window.span.cycle());
        self.reload();
    }

    pub fn go_today(&mut self) {
        self.window = DayWindow::new(Local::now().date_naive(), self.window.span);
        self.cursor_day = 0;
    }

    fn set_cursor_hour(&mut self, hour: u32) {
        let s = self.calendar.scheduler().settings();
        self.cursor_hour = hour.clamp(s.first_hour, s.last_hour);
    }

    /// Cycles the inbox category filter through the categories in use.
    pub fn cycle_category(&mut self) {
        let mut cats: Vec<String> = self
            .calendar
            .scheduler()
            .tasks()
            .filter_map(|t| t.category.clone())
            .collect();
        cats.sort();
        cats.dedup();
        self.category_filter = match &self.category_filter {
            None => cats.first().cloned(),
            Some(cur) => cats.iter().skip_while(|c| *c != cur).nth(1).cloned(),
        };
        self.reload();
    }

    // ---------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------

    pub fn cursor_day_key(&self) -> Day {
        self.window.days().get(self.cursor_day).cloned().unwrap_or_else(|| Day::from_date(self.window.start))
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.inbox_state.selected().and_then(|i| self.inbox.get(i))
    }

    /// Entry under the grid cursor. Short entries starting mid-hour count too.
    pub fn entry_under_cursor(&self) -> Option<&ScheduleEntry> {
        let day = self.cursor_day_key();
        let h = f64::from(self.cursor_hour);
        self.calendar
            .scheduler()
            .entries_on(&day)
            .iter()
            .find(|e| e.overlaps(h, h + 1.0))
    }

    /// Target task of edit/delete actions for the focused pane.
    fn focused_task_id(&self) -> Option<TaskId> {
        match self.focus {
            Focus::Inbox => self.selected_task().map(|t| t.id.clone()),
            Focus::Grid => self.entry_under_cursor().map(|e| e.task_id.clone()),
        }
    }

    /// Entries of `day` that pass the category filter. The grid dims the rest.
    pub fn filtered_ids(&self, day: &Day) -> Vec<TaskId> {
        self.calendar
            .scheduler()
            .entries_in(day, self.category_filter.as_deref())
            .map(|e| e.task_id.clone())
            .collect()
    }

    /// Projects one day onto hour rows of the visible range.
    pub fn day_column(&self, day: &Day) -> Vec<GridCell> {
        let s = *self.calendar.scheduler().settings();
        let rows = (s.last_hour - s.first_hour + 1) as usize;
        let mut cells = vec![GridCell::Free; rows];
        let row_of = |hour: f64| -> usize {
            let r = (hour.floor() - s.visible_start()).max(0.0) as usize;
            r.min(rows - 1)
        };

        for slot in self.calendar.scheduler().compute_slots(day) {
            let Some(entry) = slot.entry else { continue };
            let first = row_of(slot.start);
            // The end is exclusive: an entry ending on a marker does not touch that row.
            let last = row_of((slot.end - 1.0 / 120.0).max(slot.start));
            match &mut cells[first] {
                GridCell::Starts { more, .. } => *more += 1,
                cell => *cell = GridCell::Starts { entry: entry.clone(), more: 0 },
            }
            for cell in cells.iter_mut().take(last + 1).skip(first + 1) {
                if *cell == GridCell::Free {
                    *cell = GridCell::Continues(entry.clone());
                }
            }
        }
        cells
    }

    // ---------------------------------------------------------------------
    // Scheduling actions
    // ---------------------------------------------------------------------

    fn flash(&mut self, message: String, cell: Option<(Day, f64)>) {
        self.flash = Some(Flash { message, cell, until: Instant::now() + FLASH_DURATION });
    }

    /// Drops expired flash messages.
    pub fn tick(&mut self, now: Instant) {
        if self.flash.as_ref().is_some_and(|f| now >= f.until) {
            self.flash = None;
        }
    }

    fn report(&mut self, err: ScheduleError) {
        match err {
            ScheduleError::SlotOccupied { day, hour, occupant } => {
                let who = self
                    .calendar
                    .scheduler()
                    .task(&occupant)
                    .map(|t| t.title.clone())
                    .unwrap_or_default();
                self.flash(
                    format!("Slot occupied on {} at {} by '{}'", day, format_hhmm(hour), who),
                    Some((day, hour)),
                );
            }
            other => self.flash(other.to_string(), None),
        }
    }

    /// Enter: schedules the selected inbox task at the cursor, or drops the
    /// held entry there.
    pub fn place_at_cursor(&mut self) {
        let day = self.cursor_day_key();
        let start = f64::from(self.cursor_hour);

        if let Some(id) = self.holding.clone() {
            let duration = self
                .calendar
                .scheduler()
                .entry(&id)
                .map(ScheduleEntry::duration)
                .unwrap_or(self.calendar.scheduler().settings().granularity);
            match self.calendar.place(&id, &day, start, start + duration, None) {
                Ok(_) => self.holding = None,
                Err(e) => self.report(e),
            }
            self.reload();
            return;
        }

        if self.focus != Focus::Inbox {
            return;
        }
        let Some(id) = self.selected_task().map(|t| t.id.clone()) else { return };
        let duration = self.calendar.scheduler().settings().granularity.max(1.0);
        if let Err(e) = self.calendar.place(&id, &day, start, start + duration, None) {
            self.report(e);
        }
        self.reload();
    }

    /// Picks up the entry under the cursor for a move, or cancels a pick-up.
    pub fn toggle_hold(&mut self) {
        if self.holding.take().is_some() {
            return;
        }
        self.holding = self.entry_under_cursor().map(|e| e.task_id.clone());
    }

    /// Moves the end of the entry under the cursor by `delta` hours.
    pub fn resize_under_cursor(&mut self, delta: f64) {
        let Some((id, end)) = self.entry_under_cursor().map(|e| (e.task_id.clone(), e.end_hour)) else {
            return;
        };
        if let Err(e) = self.calendar.resize(&id, end + delta) {
            self.report(e);
        }
    }

    /// Returns the entry under the cursor to the inbox.
    pub fn retract_under_cursor(&mut self) {
        if let Some(id) = self.entry_under_cursor().map(|e| e.task_id.clone()) {
            self.calendar.retract(&id);
            self.reload();
        }
    }

    pub fn delete_focused(&mut self) {
        if let Some(id) = self.focused_task_id() {
            if let Err(e) = self.calendar.delete_task(&id) {
                self.report(e);
            }
            self.reload();
        }
    }

    /// Cycles the priority of the focused task.
    pub fn cycle_priority(&mut self) {
        let Some(id) = self.focused_task_id() else { return };
        let Some(current) = self.calendar.scheduler().task(&id).map(|t| t.priority) else { return };
        let idx = Priority::ALL.iter().position(|p| *p == current).unwrap_or(0);
        let next = Priority::ALL[(idx + 1) % Priority::ALL.len()];
        let edit = TaskEdit { priority: Some(next), ..Default::default() };
        if let Err(e) = self.calendar.edit_task(&id, edit) {
            self.report(e);
        }
        self.reload();
    }

    // ---------------------------------------------------------------------
    // Text input
    // ---------------------------------------------------------------------

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Initiates editing of a field of the focused task.
    pub fn start_edit(&mut self, field: InputField) {
        let Some(id) = self.focused_task_id() else { return };
        let Some(task) = self.calendar.scheduler().task(&id) else { return };
        self.input_buffer = match field {
            InputField::Title => task.title.clone(),
            InputField::Details => task.details.clone(),
            InputField::Category => task.category.clone().unwrap_or_default(),
            InputField::None => String::new(),
        };
        self.target_id = Some(id);
        self.input_field = field;
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    /// Handles text input based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            InputMode::Normal => {}
        }
    }

    fn handle_adding_input(&mut self) {
        match self.add_state.step {
            0 => {
                if !self.input_buffer.trim().is_empty() {
                    self.add_state.title = std::mem::take(&mut self.input_buffer);
                    self.add_state.step += 1;
                }
            }
            1 => {
                self.add_state.details = std::mem::take(&mut self.input_buffer);
                self.add_state.step += 1;
            }
            2 => match self.input_buffer.parse::<Priority>() {
                Ok(p) => {
                    self.add_state.priority = p;
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                }
                Err(msg) => self.flash(msg, None),
            },
            _ => {
                let mut draft = TaskDraft::new(self.add_state.title.clone())
                    .with_details(self.add_state.details.clone())
                    .with_priority(self.add_state.priority);
                if !self.input_buffer.trim().is_empty() {
                    draft = draft.with_category(self.input_buffer.trim());
                }
                if let Err(e) = self.calendar.add_task(draft) {
                    warn!(error = %e, "add task failed");
                    self.report(e);
                }
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
                self.reload();
            }
        }
    }

    fn handle_editing_input(&mut self) {
        if let Some(id) = self.target_id.take() {
            let value = std::mem::take(&mut self.input_buffer);
            let edit = match self.input_field {
                InputField::Title => TaskEdit { title: Some(value), ..Default::default() },
                InputField::Details => TaskEdit { details: Some(value), ..Default::default() },
                InputField::Category => TaskEdit { category: Some(value), ..Default::default() },
                InputField::None => TaskEdit::default(),
            };
            if let Err(e) = self.calendar.edit_task(&id, edit) {
                self.report(e);
            }
        }
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.reload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::days::WindowSpan;
    use crate::scheduler::SchedulerSettings;
    use crate::storage::TaskStore;
    use chrono::NaiveDate;

    fn app(dir: &tempfile::TempDir) -> App {
        let cal = Calendar::open(TaskStore::new(dir.path().join("tasks.json")), SchedulerSettings::default()).unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 3, 24).unwrap();
        let mut app = App::new(cal, DayWindow::new(start, WindowSpan::Three));
        app.cursor_hour = 9;
        app
    }

    fn add(app: &mut App, title: &str) {
        app.start_add();
        for input in [title, "", "high", ""] {
            app.input_buffer = input.to_string();
            app.handle_input();
        }
    }

    #[test]
    fn wizard_adds_task_to_inbox() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        add(&mut app, "Write report");
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.inbox.len(), 1);
        assert_eq!(app.inbox[0].priority, Priority::High);
        assert_eq!(app.inbox[0].color, "red");
    }

    #[test]
    fn placing_into_occupied_cell_flashes_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        add(&mut app, "First");
        add(&mut app, "Second");

        app.place_at_cursor();
        assert_eq!(app.inbox.len(), 1);
        assert!(app.flash.is_none());

        app.place_at_cursor();
        assert_eq!(app.inbox.len(), 1);
        let flash = app.flash.clone().unwrap();
        assert_eq!(flash.cell, Some((Day::new("2025-03-24"), 9.0)));

        app.tick(flash.until);
        assert!(app.flash.is_none());
    }

    #[test]
    fn hold_and_drop_moves_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        add(&mut app, "Movable");
        app.place_at_cursor();
        app.focus = Focus::Grid;
        app.resize_under_cursor(1.0);

        app.toggle_hold();
        assert!(app.holding.is_some());
        app.right();
        app.cursor_hour = 14;
        app.place_at_cursor();

        assert!(app.holding.is_none());
        let id = app.calendar.scheduler().tasks().next().unwrap().id.clone();
        let e = app.calendar.scheduler().entry(&id).unwrap();
        assert_eq!(e.day, Day::new("2025-03-25"));
        assert_eq!((e.start_hour, e.end_hour), (14.0, 16.0));
    }

    #[test]
    fn day_column_marks_starts_and_continuations() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        add(&mut app, "Long");
        app.place_at_cursor();
        app.focus = Focus::Grid;
        app.resize_under_cursor(2.0);

        let col = app.day_column(&Day::new("2025-03-24"));
        assert_eq!(col.len(), 24);
        assert!(matches!(col[8], GridCell::Starts { more: 0, .. }));
        assert!(matches!(col[9], GridCell::Continues(_)));
        assert!(matches!(col[10], GridCell::Continues(_)));
        assert_eq!(col[11], GridCell::Free);
    }

    #[test]
    fn retract_returns_entry_to_inbox() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        add(&mut app, "Back");
        app.place_at_cursor();
        assert!(app.inbox.is_empty());
        app.focus = Focus::Grid;
        app.retract_under_cursor();
        assert_eq!(app.inbox.len(), 1);
    }

    #[test]
    fn category_filter_selects_grid_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let day = Day::new("2025-03-24");
        let work = app.calendar.add_task(TaskDraft::new("Standup").with_category("work")).unwrap();
        let home = app.calendar.add_task(TaskDraft::new("Laundry").with_category("home")).unwrap();
        app.calendar.place(&work, &day, 9.0, 10.0, None).unwrap();
        app.calendar.place(&home, &day, 18.0, 19.0, None).unwrap();
        app.reload();

        assert_eq!(app.filtered_ids(&day), vec![work.clone(), home.clone()]);

        app.cycle_category();
        assert_eq!(app.category_filter.as_deref(), Some("home"));
        assert_eq!(app.filtered_ids(&day), vec![home]);

        app.cycle_category();
        assert_eq!(app.filtered_ids(&day), vec![work]);
        app.cycle_category();
        assert_eq!(app.category_filter, None);
    }

    #[test]
    fn cursor_wraps_into_next_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        app.cursor_day = 2;
        app.right();
        assert_eq!(app.cursor_day, 0);
        assert_eq!(app.window.start, NaiveDate::from_ymd_opt(2025, 3, 27).unwrap());
        app.left();
        assert_eq!(app.cursor_day, 2);
        assert_eq!(app.window.start, NaiveDate::from_ymd_opt(2025, 3, 24).unwrap());
    }
}
