//! Cell contents of a teacher's week.

use serde::{Deserialize, Serialize};

/// Subject marker recorded in group grids for supervised study periods.
pub const STUDY_HALL: &str = "Study Hall";

/// What a teacher is doing in one slot.
///
/// Every slot of a [`TeacherSchedule`](super::TeacherSchedule) holds exactly
/// one entry; there is no empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    /// Free time. `owner` is the grade/group the slot belongs to, often empty.
    Open {
        /// Owning group label.
        owner: String,
    },
    /// Supervised study period for a grade group.
    StudyHall {
        /// Supervised group label.
        group: String,
    },
    /// A lesson.
    Class {
        /// Taught group label (may be a range such as "6th-8th Grade").
        group: String,
        /// Subject name.
        subject: String,
    },
}

/// Discriminant of an [`Entry`], for counting and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// [`Entry::Open`].
    Open,
    /// [`Entry::StudyHall`].
    StudyHall,
    /// [`Entry::Class`].
    Class,
}

impl Entry {
    /// An open slot with no owner.
    pub fn open() -> Self {
        Entry::Open {
            owner: String::new(),
        }
    }

    /// An open slot owned by `owner`.
    pub fn open_for(owner: impl Into<String>) -> Self {
        Entry::Open {
            owner: owner.into(),
        }
    }

    /// A study hall for `group`.
    pub fn study_hall(group: impl Into<String>) -> Self {
        Entry::StudyHall {
            group: group.into(),
        }
    }

    /// A class for `group` in `subject`.
    pub fn class(group: impl Into<String>, subject: impl Into<String>) -> Self {
        Entry::Class {
            group: group.into(),
            subject: subject.into(),
        }
    }

    /// Entry discriminant.
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Open { .. } => EntryKind::Open,
            Entry::StudyHall { .. } => EntryKind::StudyHall,
            Entry::Class { .. } => EntryKind::Class,
        }
    }

    /// Whether this is free time.
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, Entry::Open { .. })
    }

    /// Open or study hall: neither is teaching load.
    #[inline]
    pub fn is_open_like(&self) -> bool {
        matches!(self, Entry::Open { .. } | Entry::StudyHall { .. })
    }

    /// Whether this is a lesson.
    #[inline]
    pub fn is_class(&self) -> bool {
        matches!(self, Entry::Class { .. })
    }

    /// Whether this is a study hall.
    #[inline]
    pub fn is_study_hall(&self) -> bool {
        matches!(self, Entry::StudyHall { .. })
    }

    /// Group served by a class or study hall. `None` for open slots.
    pub fn group(&self) -> Option<&str> {
        match self {
            Entry::Open { .. } => None,
            Entry::StudyHall { group } | Entry::Class { group, .. } => Some(group),
        }
    }

    /// Group label for any entry, including the owner of an open slot.
    pub fn label(&self) -> &str {
        match self {
            Entry::Open { owner } => owner,
            Entry::StudyHall { group } | Entry::Class { group, .. } => group,
        }
    }

    /// Subject of a class.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Entry::Class { subject, .. } => Some(subject),
            _ => None,
        }
    }

    /// Subject or study-hall marker, as recorded in group grids.
    pub fn subject_or_marker(&self) -> Option<&str> {
        match self {
            Entry::Open { .. } => None,
            Entry::StudyHall { .. } => Some(STUDY_HALL),
            Entry::Class { subject, .. } => Some(subject),
        }
    }
}
