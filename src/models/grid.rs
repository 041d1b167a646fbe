//! Weekly grids: the per-teacher schedule and the per-group mirror.
//!
//! The teacher grid is authoritative. The group grid can record only one
//! occupant per cell, so when several classes legitimately share a slot
//! (electives, co-taught classes, split multi-grade groups) only the last
//! write survives. Consumers must treat it as a best-effort index.

use serde::{Deserialize, Serialize};

use super::entry::{Entry, EntryKind, STUDY_HALL};
use super::slot::{Day, TimeSlot, SLOT_COUNT};

/// One teacher's week: exactly one [`Entry`] per slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherSchedule {
    cells: [Entry; SLOT_COUNT],
}

impl Default for TeacherSchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl TeacherSchedule {
    /// Creates a week of open slots.
    pub fn new() -> Self {
        Self {
            cells: std::array::from_fn(|_| Entry::open()),
        }
    }

    /// Sets a slot (builder form). Out-of-range slots are ignored.
    pub fn with_entry(mut self, slot: TimeSlot, entry: Entry) -> Self {
        self.set(slot, entry);
        self
    }

    /// Entry at `slot`.
    pub fn get(&self, slot: TimeSlot) -> Option<&Entry> {
        self.cells.get(slot.index()?)
    }

    /// Replaces the entry at `slot`, returning the previous one.
    ///
    /// Returns `None` (and changes nothing) for an out-of-range slot.
    pub fn set(&mut self, slot: TimeSlot, entry: Entry) -> Option<Entry> {
        let cell = self.cells.get_mut(slot.index()?)?;
        Some(std::mem::replace(cell, entry))
    }

    /// Exchanges the contents of two slots. Returns `false` if either is out of range.
    pub fn swap(&mut self, a: TimeSlot, b: TimeSlot) -> bool {
        match (a.index(), b.index()) {
            (Some(i), Some(j)) => {
                self.cells.swap(i, j);
                true
            }
            _ => false,
        }
    }

    /// All slots in day order with their entries.
    pub fn iter(&self) -> impl Iterator<Item = (TimeSlot, &Entry)> {
        TimeSlot::all().zip(self.cells.iter())
    }

    /// Entries of one day in period order.
    pub fn day(&self, day: Day) -> impl Iterator<Item = (TimeSlot, &Entry)> {
        self.iter().filter(move |(slot, _)| slot.day == day)
    }

    /// Number of entries of a kind.
    pub fn count(&self, kind: EntryKind) -> usize {
        self.cells.iter().filter(|e| e.kind() == kind).count()
    }

    /// Slots that differ from `other`.
    pub fn diff(&self, other: &TeacherSchedule) -> Vec<TimeSlot> {
        self.iter()
            .zip(other.cells.iter())
            .filter(|((_, a), b)| a != b)
            .map(|((slot, _), _)| slot)
            .collect()
    }
}

/// Occupant of a group-grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GradeCell {
    /// The group attends a lesson.
    Class {
        /// Teaching teacher.
        teacher: String,
        /// Subject name.
        subject: String,
    },
    /// The group is in a supervised study period.
    StudyHall {
        /// Supervising teacher.
        teacher: String,
    },
}

impl GradeCell {
    /// Mirror cell for a teacher entry. `None` for open slots.
    pub fn from_entry(teacher: &str, entry: &Entry) -> Option<Self> {
        match entry {
            Entry::Open { .. } => None,
            Entry::StudyHall { .. } => Some(GradeCell::StudyHall {
                teacher: teacher.to_string(),
            }),
            Entry::Class { subject, .. } => Some(GradeCell::Class {
                teacher: teacher.to_string(),
                subject: subject.clone(),
            }),
        }
    }

    /// Occupying teacher.
    pub fn teacher(&self) -> &str {
        match self {
            GradeCell::Class { teacher, .. } | GradeCell::StudyHall { teacher } => teacher,
        }
    }

    /// Subject, or the study-hall marker.
    pub fn subject_or_marker(&self) -> &str {
        match self {
            GradeCell::Class { subject, .. } => subject,
            GradeCell::StudyHall { .. } => STUDY_HALL,
        }
    }

    /// Whether this records a study hall.
    pub fn is_study_hall(&self) -> bool {
        matches!(self, GradeCell::StudyHall { .. })
    }
}

/// One group's week as seen through the mirror. `None` = nothing recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeSchedule {
    cells: [Option<GradeCell>; SLOT_COUNT],
}

impl Default for GradeSchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl GradeSchedule {
    /// Creates an empty group week.
    pub fn new() -> Self {
        Self {
            cells: std::array::from_fn(|_| None),
        }
    }

    /// Sets a cell (builder form).
    pub fn with_cell(mut self, slot: TimeSlot, cell: GradeCell) -> Self {
        self.set(slot, Some(cell));
        self
    }

    /// Occupant at `slot`.
    pub fn get(&self, slot: TimeSlot) -> Option<&GradeCell> {
        self.cells.get(slot.index()?)?.as_ref()
    }

    /// Replaces the cell at `slot`, returning the previous occupant.
    pub fn set(&mut self, slot: TimeSlot, cell: Option<GradeCell>) -> Option<GradeCell> {
        let target = self.cells.get_mut(slot.index()?)?;
        std::mem::replace(target, cell)
    }

    /// Clears `slot` only if `teacher` is the recorded occupant.
    ///
    /// Returns whether the cell was cleared.
    pub fn clear_if_teacher(&mut self, slot: TimeSlot, teacher: &str) -> bool {
        let Some(target) = slot.index().and_then(|i| self.cells.get_mut(i)) else {
            return false;
        };
        if target.as_ref().is_some_and(|c| c.teacher() == teacher) {
            *target = None;
            true
        } else {
            false
        }
    }

    /// All slots in day order with their occupants.
    pub fn iter(&self) -> impl Iterator<Item = (TimeSlot, Option<&GradeCell>)> {
        TimeSlot::all().zip(self.cells.iter().map(Option::as_ref))
    }
}
