//! Schedule option: one complete candidate timetable.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use super::entry::{Entry, EntryKind};
use super::grade::resolve_groups;
use super::grid::{GradeCell, GradeSchedule, TeacherSchedule};
use super::roster::TeacherStatus;
use super::slot::{Day, TimeSlot};

/// A study-hall coverage requirement for a group.
///
/// `teacher`, `day` and `period` stay `None` until the study hall is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyHallAssignment {
    /// Covered group.
    pub group: String,
    /// Supervising teacher.
    pub teacher: Option<String>,
    /// Day of the study hall.
    pub day: Option<Day>,
    /// Period of the study hall.
    pub period: Option<u8>,
}

impl StudyHallAssignment {
    /// An unplaced requirement.
    pub fn unplaced(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            teacher: None,
            day: None,
            period: None,
        }
    }

    /// A placed study hall.
    pub fn placed(group: impl Into<String>, teacher: impl Into<String>, slot: TimeSlot) -> Self {
        Self {
            group: group.into(),
            teacher: Some(teacher.into()),
            day: Some(slot.day),
            period: Some(slot.period),
        }
    }

    /// Placed slot, if any.
    pub fn slot(&self) -> Option<TimeSlot> {
        Some(TimeSlot::new(self.day?, self.period?))
    }

    /// Whether a teacher and slot are assigned.
    pub fn is_placed(&self) -> bool {
        self.teacher.is_some() && self.slot().is_some()
    }

    /// Whether this record describes `teacher` supervising `group` at `slot`.
    pub fn matches(&self, group: &str, teacher: &str, slot: TimeSlot) -> bool {
        self.group == group && self.teacher.as_deref() == Some(teacher) && self.slot() == Some(slot)
    }
}

/// Derived load counts for one teacher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherStats {
    /// Teacher name.
    pub teacher: String,
    /// Roster status, if the teacher is on the roster.
    pub status: Option<TeacherStatus>,
    /// Class periods.
    pub teaching: u32,
    /// Study-hall periods.
    pub study_hall: u32,
    /// Open periods.
    pub open: u32,
    /// Teaching plus study hall.
    pub total_used: u32,
    /// Consecutive open-like pairs within a day (full-time teachers only).
    pub back_to_back_issues: u32,
    /// Open-like periods beyond the first on each day.
    pub spread_open_issues: u32,
}

/// A complete candidate timetable.
///
/// Created by the solver, or by merge/swap/freeform commits; persisted as a
/// whole. Editing always happens on a clone (the working copy), never on a
/// persisted value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOption {
    /// Authoritative per-teacher grids.
    pub teacher_schedules: BTreeMap<String, TeacherSchedule>,
    /// Best-effort per-group mirror.
    pub grade_schedules: BTreeMap<String, GradeSchedule>,
    /// Study-hall coverage records.
    pub study_hall_assignments: Vec<StudyHallAssignment>,
    /// Per-teacher derived counts.
    pub teacher_stats: BTreeMap<String, TeacherStats>,
    /// Sum of per-teacher back-to-back counts.
    pub back_to_back_issues: u32,
    /// Study-hall records with a teacher and slot.
    pub study_halls_placed: u32,
}

impl ScheduleOption {
    /// Creates an empty option.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a teacher grid.
    pub fn with_teacher(mut self, name: impl Into<String>, schedule: TeacherSchedule) -> Self {
        self.teacher_schedules.insert(name.into(), schedule);
        self
    }

    /// Adds an empty group grid.
    pub fn with_group(mut self, label: impl Into<String>) -> Self {
        self.grade_schedules.entry(label.into()).or_default();
        self
    }

    /// Adds a study-hall record.
    pub fn with_study_hall_assignment(mut self, assignment: StudyHallAssignment) -> Self {
        self.study_hall_assignments.push(assignment);
        self
    }

    /// Rebuilds every group grid from the teacher grids.
    ///
    /// For shared slots the teacher that sorts last wins. Intended for
    /// building fresh options, never for patching an edited one.
    pub fn with_mirror_from_teachers(mut self) -> Self {
        for grid in self.grade_schedules.values_mut() {
            *grid = GradeSchedule::new();
        }
        let cells: Vec<(String, TimeSlot, Entry)> = self
            .teacher_schedules
            .iter()
            .flat_map(|(name, schedule)| {
                schedule
                    .iter()
                    .filter(|(_, e)| !e.is_open())
                    .map(|(slot, e)| (name.clone(), slot, e.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (teacher, slot, entry) in cells {
            self.mirror_write(&teacher, slot, &entry);
        }
        self
    }

    /// Grid of a teacher.
    pub fn teacher(&self, name: &str) -> Option<&TeacherSchedule> {
        self.teacher_schedules.get(name)
    }

    /// Entry of a teacher at a slot.
    pub fn entry(&self, teacher: &str, slot: TimeSlot) -> Option<&Entry> {
        self.teacher(teacher)?.get(slot)
    }

    /// Names of all group grids.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.grade_schedules.keys().map(String::as_str)
    }

    /// Group grids covered by a label.
    pub fn resolve_groups(&self, label: &str) -> Vec<String> {
        resolve_groups(label, self.group_names())
    }

    /// Groups covered by a label, for overlap tests.
    ///
    /// Falls back to the trimmed label itself when nothing resolves, so two
    /// entries with the same unresolvable label still overlap.
    pub fn covered_groups(&self, label: &str) -> BTreeSet<String> {
        let resolved = self.resolve_groups(label);
        if resolved.is_empty() {
            BTreeSet::from([label.trim().to_string()])
        } else {
            resolved.into_iter().collect()
        }
    }

    /// Removes `teacher` from the mirror at `slot` for every group of `label`.
    ///
    /// Cells occupied by another teacher are left alone.
    pub fn mirror_clear(&mut self, teacher: &str, slot: TimeSlot, label: &str) {
        for group in self.resolve_groups(label) {
            if let Some(grid) = self.grade_schedules.get_mut(&group) {
                grid.clear_if_teacher(slot, teacher);
            }
        }
    }

    /// Records `teacher`'s entry at `slot` in every group grid of its label.
    ///
    /// Returns the number of group grids written.
    pub fn mirror_write(&mut self, teacher: &str, slot: TimeSlot, entry: &Entry) -> usize {
        let Some(cell) = GradeCell::from_entry(teacher, entry) else {
            return 0;
        };
        let groups = self.resolve_groups(entry.label());
        if groups.is_empty() {
            warn!(
                teacher,
                %slot,
                label = entry.label(),
                "entry label matches no group grid"
            );
        }
        for group in &groups {
            if let Some(grid) = self.grade_schedules.get_mut(group) {
                grid.set(slot, Some(cell.clone()));
            }
        }
        groups.len()
    }

    /// Number of entries of each kind across all teacher grids.
    pub fn entry_kind_counts(&self) -> BTreeMap<EntryKind, usize> {
        let mut counts = BTreeMap::new();
        for schedule in self.teacher_schedules.values() {
            for (_, entry) in schedule.iter() {
                *counts.entry(entry.kind()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Number of study-hall entries across all teacher grids.
    pub fn study_hall_count(&self) -> usize {
        self.teacher_schedules
            .values()
            .map(|s| s.count(EntryKind::StudyHall))
            .sum()
    }

    /// Index of the study-hall record for `group`/`teacher`/`slot`.
    pub fn study_hall_record(&self, group: &str, teacher: &str, slot: TimeSlot) -> Option<usize> {
        self.study_hall_assignments
            .iter()
            .position(|a| a.matches(group, teacher, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_option() -> ScheduleOption {
        let slot = TimeSlot::new(Day::Mon, 3);
        ScheduleOption::new()
            .with_group("5th")
            .with_group("6th")
            .with_teacher(
                "A",
                TeacherSchedule::new()
                    .with_entry(slot, Entry::study_hall("5th"))
                    .with_entry(TimeSlot::new(Day::Mon, 1), Entry::class("5th-6th", "Math")),
            )
            .with_teacher("B", TeacherSchedule::new())
            .with_study_hall_assignment(StudyHallAssignment::placed("5th", "A", slot))
            .with_mirror_from_teachers()
    }

    #[test]
    fn test_mirror_built_from_teachers() {
        let opt = sample_option();
        let sh = opt.grade_schedules["5th"]
            .get(TimeSlot::new(Day::Mon, 3))
            .unwrap();
        assert_eq!(sh.teacher(), "A");
        assert!(sh.is_study_hall());

        // Range label lands in both group grids.
        for g in ["5th", "6th"] {
            let c = opt.grade_schedules[g].get(TimeSlot::new(Day::Mon, 1)).unwrap();
            assert_eq!(c.subject_or_marker(), "Math");
        }
    }

    #[test]
    fn test_mirror_clear_respects_other_occupant() {
        let mut opt = sample_option();
        let slot = TimeSlot::new(Day::Mon, 3);
        opt.mirror_clear("B", slot, "5th");
        assert!(opt.grade_schedules["5th"].get(slot).is_some());
        opt.mirror_clear("A", slot, "5th");
        assert!(opt.grade_schedules["5th"].get(slot).is_none());
    }

    #[test]
    fn test_counts_and_records() {
        let opt = sample_option();
        let counts = opt.entry_kind_counts();
        assert_eq!(counts[&EntryKind::Class], 1);
        assert_eq!(counts[&EntryKind::StudyHall], 1);
        assert_eq!(counts[&EntryKind::Open], 48);
        assert_eq!(opt.study_hall_count(), 1);
        assert_eq!(
            opt.study_hall_record("5th", "A", TimeSlot::new(Day::Mon, 3)),
            Some(0)
        );
        assert!(opt.study_hall_assignments[0].is_placed());
        assert!(!StudyHallAssignment::unplaced("7th").is_placed());
    }

    #[test]
    fn test_unresolvable_label_writes_nothing() {
        let mut opt = sample_option();
        let meeting = Entry::class("Staff", "Meeting");
        let n = opt.mirror_write("B", TimeSlot::new(Day::Fri, 1), &meeting);
        assert_eq!(n, 0);
    }
}
