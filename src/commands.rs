use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::calendar::Calendar;
use crate::config::Config;
use crate::days::{day_header, DayWindow, WindowSpan};
use crate::models::{Day, Priority, ScheduleEntry, Task, TaskDraft, TaskEdit, TaskId};
use crate::scheduler::{Placement, ScheduleError};
use crate::storage::TaskStore;
use crate::timefmt::{format_12h, format_hhmm, parse_hour};

/// Opens the calendar described by `config`.
pub fn open_calendar(config: &Config) -> Result<Calendar> {
    let store = TaskStore::new(&config.db_path);
    Calendar::open(store, config.scheduler)
        .with_context(|| format!("failed to load tasks from {}", config.db_path.display()))
}

/// Parses a day argument: `today`, `tomorrow`, `YYYY-MM-DD`, or a raw label
/// such as `mon` (kept as an upper-case key).
pub fn parse_day(input: &str) -> Result<Day> {
    let s = input.trim();
    let today = Local::now().date_naive();
    match s.to_lowercase().as_str() {
        "" => bail!("day cannot be empty"),
        "today" => return Ok(Day::from_date(today)),
        "tomorrow" => return Ok(Day::from_date(today.succ_opt().unwrap_or(today))),
        _ => {}
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Day::from_date(d));
    }
    if s.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(Day::new(s.to_uppercase()));
    }
    bail!("invalid day '{}': use today, tomorrow, YYYY-MM-DD or a weekday label", input)
}

fn priority_color(p: Priority) -> Color {
    match p {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
        Priority::None => Color::Grey,
    }
}

fn describe(cal: &Calendar, err: &ScheduleError) -> String {
    match err {
        ScheduleError::SlotOccupied { day, hour, occupant } => {
            let title = cal
                .scheduler()
                .task(occupant)
                .map(|t| t.title.as_str())
                .unwrap_or("another task");
            format!("Slot occupied on {} at {} by '{}'.", day, format_hhmm(*hour), title)
        }
        ScheduleError::ResizeBlocked { blocker, .. } => {
            let title = cal
                .scheduler()
                .task(blocker)
                .map(|t| t.title.as_str())
                .unwrap_or("another task");
            format!("Cannot resize: '{}' starts inside the new range.", title)
        }
        other => other.to_string(),
    }
}

/// Adds a new task to the inbox.
pub fn cmd_add(
    config: &Config,
    title: String,
    details: Option<String>,
    priority: Priority,
    color: Option<String>,
    category: Option<String>,
) -> Result<TaskId> {
    let mut cal = open_calendar(config)?;
    let mut draft = TaskDraft::new(title).with_priority(priority);
    draft.details = details.unwrap_or_default();
    draft.color = color;
    draft.category = category;
    let id = cal.add_task(draft)?;
    println!("Task added (id = {})", id.short());
    Ok(id)
}

/// Lists the inbox, or every task with its placement when `all` is set.
pub fn cmd_list(config: &Config, all: bool, category: Option<String>) -> Result<()> {
    let cal = open_calendar(config)?;
    let sched = cal.scheduler();
    let tasks: Vec<&Task> = if all { sched.tasks().collect() } else { sched.unscheduled().collect() };
    let tasks: Vec<&Task> = tasks
        .into_iter()
        .filter(|t| category.is_none() || t.category == category)
        .collect();

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Color").add_attribute(Attribute::Bold),
            Cell::new("Category").add_attribute(Attribute::Bold),
            Cell::new("Scheduled").add_attribute(Attribute::Bold),
        ]);

    for t in tasks {
        let scheduled = match sched.entry(&t.id) {
            Some(e) => format!("{} {}-{}", e.day, format_hhmm(e.start_hour), format_hhmm(e.end_hour)),
            None => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(t.id.short()),
            Cell::new(&t.title),
            Cell::new(t.priority).fg(priority_color(t.priority)),
            Cell::new(&t.color),
            Cell::new(t.category.clone().unwrap_or_default()),
            Cell::new(scheduled),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Edits an existing task's content.
pub fn cmd_edit(config: &Config, id: &str, edit: TaskEdit) -> Result<()> {
    let mut cal = open_calendar(config)?;
    let id = cal.resolve(id)?;
    cal.edit_task(&id, edit)?;
    println!("Task {} updated.", id.short());
    Ok(())
}

/// Removes a task and its placement.
pub fn cmd_remove(config: &Config, id: &str) -> Result<()> {
    let mut cal = open_calendar(config)?;
    let id = cal.resolve(id)?;
    let task = cal.delete_task(&id)?;
    println!("Task '{}' removed.", task.title);
    Ok(())
}

/// Places (or moves) a task on a day. Without `end` the entry lasts one
/// granularity unit.
pub fn cmd_place(config: &Config, id: &str, day: &str, start: &str, end: Option<&str>) -> Result<Placement> {
    let mut cal = open_calendar(config)?;
    let id = cal.resolve(id)?;
    let day = parse_day(day)?;
    let start = parse_hour(start)?;
    let end = match end {
        Some(e) => parse_hour(e)?,
        None => start + config.scheduler.granularity,
    };

    match cal.place(&id, &day, start, end, None) {
        Ok(outcome) => {
            if let Some(entry) = cal.scheduler().entry(&id) {
                println!("{}", placement_message(outcome, entry));
            }
            Ok(outcome)
        }
        Err(e) => bail!(describe(&cal, &e)),
    }
}

/// Confirmation line for an accepted placement, showing the stored
/// (minute-rounded) interval.
fn placement_message(outcome: Placement, entry: &ScheduleEntry) -> String {
    let verb = match outcome {
        Placement::Created => "Scheduled",
        Placement::Moved => "Moved",
    };
    format!(
        "{} {} on {} {}-{}.",
        verb,
        entry.task_id.short(),
        entry.day,
        format_hhmm(entry.start_hour),
        format_hhmm(entry.end_hour)
    )
}

/// Changes the end of a scheduled task.
pub fn cmd_resize(config: &Config, id: &str, end: &str) -> Result<f64> {
    let mut cal = open_calendar(config)?;
    let id = cal.resolve(id)?;
    let requested = parse_hour(end)?;
    match cal.resize(&id, requested) {
        Ok(effective) => {
            if effective != requested {
                println!("Task {} now ends at {} (minimum duration).", id.short(), format_hhmm(effective));
            } else {
                println!("Task {} now ends at {}.", id.short(), format_hhmm(effective));
            }
            Ok(effective)
        }
        Err(e) => bail!(describe(&cal, &e)),
    }
}

/// Returns a task to the inbox.
pub fn cmd_retract(config: &Config, id: &str) -> Result<()> {
    let mut cal = open_calendar(config)?;
    let id = cal.resolve(id)?;
    if cal.retract(&id) {
        println!("Task {} returned to the inbox.", id.short());
    } else {
        println!("Task {} was not scheduled.", id.short());
    }
    Ok(())
}

/// One printed row of a day's timetable.
#[derive(Debug, Clone, PartialEq)]
pub enum ShowRow<'a> {
    Free { start: f64, end: f64 },
    Entry(&'a ScheduleEntry),
    /// An entry hidden by the category filter; only its time is shown.
    Busy { start: f64, end: f64 },
}

/// Lays out one day from its slot projection.
///
/// Runs of free hours are merged into one row unless `full` is set. With a
/// category, entries outside it collapse to [`ShowRow::Busy`].
pub fn day_rows<'a>(cal: &'a Calendar, day: &Day, category: Option<&str>, full: bool) -> Vec<ShowRow<'a>> {
    let sched = cal.scheduler();
    let shown: Vec<&TaskId> = sched.entries_in(day, category).map(|e| &e.task_id).collect();

    let mut rows = Vec::new();
    let mut free: Option<(f64, f64)> = None;
    for slot in sched.compute_slots(day) {
        match slot.entry {
            None if !full => {
                free = Some(match free {
                    Some((s, _)) => (s, slot.end),
                    None => (slot.start, slot.end),
                });
            }
            None => rows.push(ShowRow::Free { start: slot.start, end: slot.end }),
            Some(e) => {
                if let Some((start, end)) = free.take() {
                    rows.push(ShowRow::Free { start, end });
                }
                if shown.contains(&&e.task_id) {
                    rows.push(ShowRow::Entry(e));
                } else {
                    rows.push(ShowRow::Busy { start: slot.start, end: slot.end });
                }
            }
        }
    }
    if let Some((start, end)) = free {
        rows.push(ShowRow::Free { start, end });
    }
    rows
}

/// Prints the timetable for a window of days.
pub fn cmd_show(
    config: &Config,
    from: Option<&str>,
    days: Option<u32>,
    category: Option<&str>,
    full: bool,
) -> Result<()> {
    let cal = open_calendar(config)?;
    let span = match days {
        Some(n) => WindowSpan::try_from(n).map_err(anyhow::Error::msg)?,
        None => config.window,
    };
    let start = match from {
        Some(s) => parse_day(s)?
            .date()
            .with_context(|| format!("'{}' is not a calendar date", s))?,
        None => Local::now().date_naive(),
    };

    for day in DayWindow::new(start, span).days() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new(day_header(&day)).add_attribute(Attribute::Bold),
                Cell::new("Task").add_attribute(Attribute::Bold),
                Cell::new("Priority").add_attribute(Attribute::Bold),
                Cell::new("Category").add_attribute(Attribute::Bold),
            ]);

        for row in day_rows(&cal, &day, category, full) {
            table.add_row(match row {
                ShowRow::Free { start, end } => time_row(start, end, ""),
                ShowRow::Busy { start, end } => time_row(start, end, "busy"),
                ShowRow::Entry(e) => entry_row(e),
            });
        }
        println!("{table}");
    }
    Ok(())
}

fn time_row(start: f64, end: f64, label: &str) -> Vec<Cell> {
    vec![
        Cell::new(format!("{} - {}", format_12h(start), format_12h(end))).fg(Color::DarkGrey),
        Cell::new(label).fg(Color::DarkGrey),
        Cell::new(""),
        Cell::new(""),
    ]
}

fn entry_row(e: &ScheduleEntry) -> Vec<Cell> {
    vec![
        Cell::new(format!("{} - {}", format_12h(e.start_hour), format_12h(e.end_hour))),
        Cell::new(format!("{} ({})", e.title, e.task_id.short())).add_attribute(Attribute::Bold),
        Cell::new(e.priority).fg(priority_color(e.priority)),
        Cell::new(e.category.clone().unwrap_or_default()),
    ]
}

/// Resets the database by deleting all tasks.
pub fn cmd_reset(config: &Config, force: bool) -> Result<()> {
    if !force {
        print!("Are you sure you want to delete all tasks? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    TaskStore::new(&config.db_path)
        .reset()
        .context("failed to reset database")?;
    println!("Database reset successfully.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_day_accepts_dates_and_labels() {
        assert_eq!(parse_day("2025-03-24").unwrap(), Day::new("2025-03-24"));
        assert_eq!(parse_day("mon").unwrap(), Day::new("MON"));
        assert_eq!(parse_day("today").unwrap(), Day::from_date(Local::now().date_naive()));
        assert!(parse_day("").is_err());
        assert!(parse_day("24/03").is_err());
    }

    fn calendar(dir: &tempfile::TempDir) -> Calendar {
        open_calendar(&Config::with_db(dir.path().join("tasks.json"))).unwrap()
    }

    #[test]
    fn placement_message_shows_stored_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut cal = calendar(&dir);
        let id = cal.add_task(TaskDraft::new("Odd").with_id("task-odd00001")).unwrap();
        let day = Day::new("MON");
        let outcome = cal.place(&id, &day, 9.0 + 20.4 / 60.0, 10.0 + 0.7 / 60.0, None).unwrap();
        let entry = cal.scheduler().entry(&id).unwrap();
        assert_eq!(placement_message(outcome, entry), "Scheduled odd00001 on MON 09:20-10:01.");
    }

    #[test]
    fn day_rows_merge_free_time_and_hide_other_categories() {
        let dir = tempfile::tempdir().unwrap();
        let mut cal = calendar(&dir);
        let day = Day::new("2025-03-24");
        let work = cal.add_task(TaskDraft::new("Standup").with_category("work")).unwrap();
        let home = cal.add_task(TaskDraft::new("Laundry").with_category("home")).unwrap();
        cal.place(&work, &day, 9.0, 10.0, None).unwrap();
        cal.place(&home, &day, 18.5, 19.0, None).unwrap();

        let rows = day_rows(&cal, &day, None, false);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], ShowRow::Free { start: 1.0, end: 9.0 });
        assert!(matches!(rows[1], ShowRow::Entry(e) if e.task_id == work));
        assert_eq!(rows[2], ShowRow::Free { start: 10.0, end: 18.5 });
        assert!(matches!(rows[3], ShowRow::Entry(e) if e.task_id == home));
        assert_eq!(rows[4], ShowRow::Free { start: 19.0, end: 25.0 });

        let rows = day_rows(&cal, &day, Some("work"), false);
        assert!(matches!(rows[1], ShowRow::Entry(e) if e.task_id == work));
        assert_eq!(rows[3], ShowRow::Busy { start: 18.5, end: 19.0 });

        let full = day_rows(&cal, &day, None, true);
        assert_eq!(full.iter().filter(|r| matches!(r, ShowRow::Free { .. })).count(), 23);
    }
}
