//! Task calendar: a task inbox and a rolling day timetable.
//!
//! The heart of the crate is [`scheduler::Scheduler`], an interval model that
//! places tasks onto half-open hour ranges of a day and refuses overlaps.
//! [`calendar::Calendar`] wires it to the JSON [`storage::TaskStore`]; the CLI
//! in [`commands`] and the terminal UI in [`tui`] sit on top.

pub mod calendar;
pub mod commands;
pub mod config;
pub mod days;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod slots;
pub mod storage;
pub mod timefmt;
pub mod tui;

pub use calendar::Calendar;
pub use models::{Day, Overrides, Priority, ScheduleEntry, Task, TaskDraft, TaskEdit, TaskId};
pub use scheduler::{Placement, ScheduleError, Scheduler, SchedulerSettings};
pub use slots::TimeSlot;
