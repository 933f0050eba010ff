use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::Day;

/// Number of days shown side by side in the timetable.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowSpan {
    One,
    #[default]
    Three,
    Seven,
}

impl WindowSpan {
    pub fn days(self) -> u32 {
        match self {
            WindowSpan::One => 1,
            WindowSpan::Three => 3,
            WindowSpan::Seven => 7,
        }
    }

    /// One -> Three -> Seven -> One.
    pub fn cycle(self) -> Self {
        match self {
            WindowSpan::One => WindowSpan::Three,
            WindowSpan::Three => WindowSpan::Seven,
            WindowSpan::Seven => WindowSpan::One,
        }
    }
}

impl TryFrom<u32> for WindowSpan {
    type Error = String;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(WindowSpan::One),
            3 => Ok(WindowSpan::Three),
            7 => Ok(WindowSpan::Seven),
            other => Err(format!("window must be 1, 3 or 7 days, got {}", other)),
        }
    }
}

/// Rolling window of visible days starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: NaiveDate,
    pub span: WindowSpan,
}

impl DayWindow {
    pub fn new(start: NaiveDate, span: WindowSpan) -> Self {
        Self { start, span }
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..self.span.days())
            .map(|i| self.start + Duration::days(i64::from(i)))
            .collect()
    }

    pub fn days(&self) -> Vec<Day> {
        self.dates().into_iter().map(Day::from_date).collect()
    }

    /// Advances the window by its own span.
    pub fn next(&self) -> Self {
        Self::new(self.start + Duration::days(i64::from(self.span.days())), self.span)
    }

    pub fn previous(&self) -> Self {
        Self::new(self.start - Duration::days(i64::from(self.span.days())), self.span)
    }

    pub fn with_span(&self, span: WindowSpan) -> Self {
        Self::new(self.start, span)
    }
}

/// Column header label for a weekday, e.g. `MON`, `TUES`.
pub fn weekday_label(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "MON",
        Weekday::Tue => "TUES",
        Weekday::Wed => "WED",
        Weekday::Thu => "THURS",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
        Weekday::Sun => "SUN",
    }
}

/// Header text for a day: `MON 24` for dated days, the raw key otherwise.
pub fn day_header(day: &Day) -> String {
    match day.date() {
        Some(d) => format!("{} {}", weekday_label(d), d.day()),
        None => day.to_string(),
    }
}
