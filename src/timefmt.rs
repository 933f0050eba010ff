//! Conversions between fractional hours and clock strings.
//!
//! The scheduler works in real-valued hours since day start. Storage keeps a
//! `time_range` column formatted as `HH:MM-HH:MM`, and the CLI accepts either
//! decimal hours (`9.5`) or clock times (`09:30`, `9:30pm`).

use chrono::{NaiveTime, Timelike};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid time '{0}' (expected HH:MM, H[am|pm] or decimal hours)")]
    Time(String),
    #[error("invalid time range '{0}' (expected HH:MM-HH:MM)")]
    Range(String),
}

/// Rounds an hour value to the nearest whole minute.
pub fn round_to_minute(hour: f64) -> f64 {
    (hour * 60.0).round() / 60.0
}

fn split_minutes(hour: f64) -> (u32, u32) {
    let total = (hour * 60.0).round().max(0.0) as u32;
    (total / 60, total % 60)
}

/// Formats hours as a 24-hour clock string, e.g. `9.5` -> `"09:30"`.
pub fn format_hhmm(hour: f64) -> String {
    let (h, m) = split_minutes(hour);
    format!("{:02}:{:02}", h, m)
}

/// Formats hours as a 12-hour label, e.g. `13.25` -> `"1:15 PM"`.
pub fn format_12h(hour: f64) -> String {
    let (h, m) = split_minutes(hour);
    let h = h % 24;
    let (h12, suffix) = match h {
        0 => (12, "AM"),
        1..=11 => (h, "AM"),
        12 => (12, "PM"),
        _ => (h - 12, "PM"),
    };
    format!("{}:{:02} {}", h12, m, suffix)
}

/// Clock forms accepted by [`parse_hour`], tried in order on input with
/// whitespace removed.
const CLOCK_FORMATS: [&str; 3] = ["%H:%M", "%I:%M%p", "%I%p"];

fn clock_hours(t: NaiveTime) -> f64 {
    f64::from(t.hour()) + f64::from(t.minute()) / 60.0
}

/// Parses a single time of day into fractional hours.
///
/// Accepts clock times (`09:30`, `1:30pm`, `12am`), decimal hours (`9.5`),
/// and `HH:MM` past midnight (`24:00`, `25:00`) as written for range ends.
pub fn parse_hour(input: &str) -> Result<f64, ParseError> {
    let err = || ParseError::Time(input.to_string());
    let s: String = input.split_whitespace().collect();
    if s.is_empty() {
        return Err(err());
    }

    if let Some(t) = CLOCK_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&s, fmt).ok())
    {
        return Ok(clock_hours(t));
    }

    // NaiveTime stops at 23:59; range ends can sit on or past midnight.
    if let Some((h, m)) = s.split_once(':') {
        let h: u32 = h.parse().map_err(|_| err())?;
        if h < 24 {
            return Err(err());
        }
        let minutes = NaiveTime::parse_from_str(&format!("00:{}", m), "%H:%M").map_err(|_| err())?;
        return Ok(f64::from(h) + clock_hours(minutes));
    }

    let v: f64 = s.parse().map_err(|_| err())?;
    if !v.is_finite() || v < 0.0 {
        return Err(err());
    }
    Ok(round_to_minute(v))
}

/// Formats a `time_range` column value.
pub fn format_range(start: f64, end: f64) -> String {
    format!("{}-{}", format_hhmm(start), format_hhmm(end))
}

/// Parses a `time_range` column value into `(start, end)` hours.
pub fn parse_range(input: &str) -> Result<(f64, f64), ParseError> {
    let (a, b) = input
        .split_once('-')
        .ok_or_else(|| ParseError::Range(input.to_string()))?;
    let start = parse_hour(a).map_err(|_| ParseError::Range(input.to_string()))?;
    let end = parse_hour(b).map_err(|_| ParseError::Range(input.to_string()))?;
    Ok((start, end))
}
