//! Week grid coordinates.
//!
//! A timetable week has five school days with five periods each. Every
//! grid in this crate is a dense array of `SLOT_COUNT` cells, indexed
//! day-major (`day * 5 + period - 1`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of school days in a week.
pub const DAYS_PER_WEEK: usize = 5;

/// Number of periods in a school day.
pub const PERIODS_PER_DAY: u8 = 5;

/// Number of cells in a weekly grid.
pub const SLOT_COUNT: usize = DAYS_PER_WEEK * PERIODS_PER_DAY as usize;

/// A school day.
///
/// Serialized with the short codes used by the timetable documents
/// (`"Mon"`, `"Tues"`, `"Wed"`, `"Thurs"`, `"Fri"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    /// Monday.
    Mon,
    /// Tuesday.
    Tues,
    /// Wednesday.
    Wed,
    /// Thursday.
    Thurs,
    /// Friday.
    Fri,
}

impl Day {
    /// All days in week order.
    pub const ALL: [Day; DAYS_PER_WEEK] = [Day::Mon, Day::Tues, Day::Wed, Day::Thurs, Day::Fri];

    /// Zero-based position in the week.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Day::Mon => 0,
            Day::Tues => 1,
            Day::Wed => 2,
            Day::Thurs => 3,
            Day::Fri => 4,
        }
    }

    /// Day for a zero-based position, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Short code used in documents and messages.
    pub fn code(self) -> &'static str {
        match self {
            Day::Mon => "Mon",
            Day::Tues => "Tues",
            Day::Wed => "Wed",
            Day::Thurs => "Thurs",
            Day::Fri => "Fri",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A (day, period) coordinate. Periods are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    /// School day.
    pub day: Day,
    /// Period within the day (1..=5).
    pub period: u8,
}

impl TimeSlot {
    /// Creates a slot. Out-of-range periods are representable but have no
    /// grid index; use [`TimeSlot::is_valid`] on untrusted input.
    pub fn new(day: Day, period: u8) -> Self {
        Self { day, period }
    }

    /// Slot for a dense grid index.
    pub fn from_index(index: usize) -> Option<Self> {
        let day = Day::from_index(index / PERIODS_PER_DAY as usize)?;
        let period = (index % PERIODS_PER_DAY as usize) as u8 + 1;
        Some(Self { day, period })
    }

    /// Dense grid index, or `None` when the period is out of range.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        let p = self.period.checked_sub(1)?;
        if p >= PERIODS_PER_DAY {
            return None;
        }
        Some(self.day.index() * PERIODS_PER_DAY as usize + p as usize)
    }

    /// Whether the period lies in 1..=5.
    pub fn is_valid(&self) -> bool {
        self.index().is_some()
    }

    /// All 25 slots in day order.
    pub fn all() -> impl Iterator<Item = TimeSlot> {
        (0..SLOT_COUNT).filter_map(TimeSlot::from_index)
    }

    /// The slots of one day, in period order.
    pub fn day_slots(day: Day) -> impl Iterator<Item = TimeSlot> {
        (1..=PERIODS_PER_DAY).map(move |period| TimeSlot { day, period })
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} P{}", self.day, self.period)
    }
}
