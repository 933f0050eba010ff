//! Projection of a day's entries onto renderable time slots.
//!
//! [`Slots`] walks the visible hour range once, front to back, and yields a
//! gap-free, non-overlapping sequence of [`TimeSlot`]s:
//!
//! * empty space comes out as slots aligned to hour markers (one hour each,
//!   except when cut short by an entry starting mid-hour);
//! * each entry comes out as a single slot spanning its whole interval,
//!   clipped to the visible range;
//! * an entry ending mid-hour is followed by an empty slot up to the next
//!   marker.
//!
//! The iterator borrows the day's sorted entries and holds no other state, so
//! a new one can be taken at any time to restart the projection.

use crate::models::ScheduleEntry;

/// Half-open interval `[start, end)` of a day, empty or holding one entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSlot<'a> {
    pub start: f64,
    pub end: f64,
    pub entry: Option<&'a ScheduleEntry>,
}

impl TimeSlot<'_> {
    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone)]
pub struct Slots<'a> {
    /// Entries of one day sorted by start, pairwise non-overlapping.
    entries: &'a [ScheduleEntry],
    next: usize,
    cursor: f64,
    first: f64,
    end: f64,
}

impl<'a> Slots<'a> {
    pub fn new(entries: &'a [ScheduleEntry], first: f64, end: f64) -> Self {
        Self { entries, next: 0, cursor: first, first, end }
    }

    fn next_marker(&self) -> f64 {
        let marker = self.first + (self.cursor - self.first).floor() + 1.0;
        marker.min(self.end)
    }
}

impl<'a> Iterator for Slots<'a> {
    type Item = TimeSlot<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }

        // Entries that ended before the cursor (only possible before the
        // visible range) are skipped.
        while self
            .entries
            .get(self.next)
            .is_some_and(|e| e.end_hour <= self.cursor)
        {
            self.next += 1;
        }

        let start = self.cursor;
        let marker = self.next_marker();
        let slot = match self.entries.get(self.next) {
            Some(e) if e.start_hour <= start => {
                self.next += 1;
                TimeSlot { start, end: e.end_hour.min(self.end), entry: Some(e) }
            }
            Some(e) if e.start_hour < marker => TimeSlot { start, end: e.start_hour, entry: None },
            _ => TimeSlot { start, end: marker, entry: None },
        };
        self.cursor = slot.end;
        Some(slot)
    }
}

impl std::iter::FusedIterator for Slots<'_> {}
