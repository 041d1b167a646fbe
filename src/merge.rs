//! Regeneration merge.
//!
//! Folds solver output for a subset of teachers into an existing option.
//! Teachers outside the subset are locked: their grids are taken from the
//! original, and the solver's copy of them is only compared for integrity.
//!
//! The group mirror is patched, never rebuilt, so shared-slot information
//! recorded for locked teachers survives.

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::models::ScheduleOption;
use crate::stats;
use crate::validation::{ValidationError, ValidationKind};

/// Result of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The merged option.
    pub option: ScheduleOption,
    /// Locked-teacher findings against the solver output.
    pub integrity: Vec<ValidationError>,
}

impl MergeOutcome {
    /// Whether the solver left every locked teacher untouched.
    pub fn is_clean(&self) -> bool {
        self.integrity.is_empty()
    }
}

/// Merges `regenerated` into `original` for the teachers in `subset`.
///
/// A subset teacher missing from `regenerated` keeps its original grid.
/// With an empty subset the merged option equals `original`.
pub fn merge_regenerated(
    original: &ScheduleOption,
    regenerated: &ScheduleOption,
    subset: &[String],
) -> MergeOutcome {
    let mut merged = original.clone();

    let applied: BTreeSet<&str> = subset
        .iter()
        .map(String::as_str)
        .filter(|name| {
            let present = regenerated.teacher_schedules.contains_key(*name);
            if !present {
                warn!(teacher = *name, "regenerated option lacks teacher; keeping original grid");
            }
            present
        })
        .collect();

    for name in &applied {
        if let Some(grid) = regenerated.teacher(name) {
            merged.teacher_schedules.insert(name.to_string(), grid.clone());
        }
    }

    // Mirror: drop what regenerated teachers held, then write their new cells.
    for grid in merged.grade_schedules.values_mut() {
        let held: Vec<_> = grid
            .iter()
            .filter(|(_, cell)| cell.is_some_and(|c| applied.contains(c.teacher())))
            .map(|(slot, _)| slot)
            .collect();
        for slot in held {
            grid.set(slot, None);
        }
    }
    for (group, grid) in &regenerated.grade_schedules {
        for (slot, cell) in grid.iter() {
            let Some(cell) = cell.filter(|c| applied.contains(c.teacher())) else {
                continue;
            };
            merged
                .grade_schedules
                .entry(group.clone())
                .or_default()
                .set(slot, Some(cell.clone()));
        }
    }

    // Study halls: keep locked teachers' records, take the subset's new ones.
    let owned_by_applied = |teacher: &Option<String>| {
        teacher
            .as_deref()
            .is_some_and(|t| applied.contains(t))
    };
    let fresh: Vec<_> = regenerated
        .study_hall_assignments
        .iter()
        .filter(|a| owned_by_applied(&a.teacher))
        .cloned()
        .collect();
    let now_covered: BTreeSet<&str> = fresh.iter().map(|a| a.group.as_str()).collect();
    let mut assignments: Vec<_> = original
        .study_hall_assignments
        .iter()
        .filter(|a| !owned_by_applied(&a.teacher))
        .filter(|a| a.is_placed() || !now_covered.contains(a.group.as_str()))
        .cloned()
        .collect();
    assignments.extend(fresh);
    merged.study_hall_assignments = assignments;

    for name in &applied {
        match regenerated.teacher_stats.get(*name) {
            Some(s) => {
                merged.teacher_stats.insert(name.to_string(), s.clone());
            }
            None => {
                merged.teacher_stats.remove(*name);
            }
        }
    }
    if !applied.is_empty() {
        stats::refresh_aggregates(&mut merged);
    }

    let integrity = locked_integrity(original, regenerated, subset);
    info!(
        regenerated = applied.len(),
        locked = original.teacher_schedules.len().saturating_sub(applied.len()),
        integrity_errors = integrity.len(),
        "regeneration merged"
    );
    MergeOutcome {
        option: merged,
        integrity,
    }
}

/// Compares every locked teacher of `original` with the solver's copy.
///
/// One `locked_teacher_modified` per altered slot, one
/// `locked_teacher_missing` per absent teacher.
pub fn locked_integrity(
    original: &ScheduleOption,
    regenerated: &ScheduleOption,
    subset: &[String],
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (name, grid) in &original.teacher_schedules {
        if subset.contains(name) {
            continue;
        }
        let Some(theirs) = regenerated.teacher(name) else {
            warn!(teacher = %name, "locked teacher missing from solver output");
            errors.push(
                ValidationError::new(
                    ValidationKind::LockedTeacherMissing,
                    format!("locked teacher {name} is missing from the regenerated timetable"),
                )
                .with_teacher(name.clone()),
            );
            continue;
        };
        for slot in grid.diff(theirs) {
            warn!(teacher = %name, %slot, "locked teacher modified by solver");
            errors.push(
                ValidationError::new(
                    ValidationKind::LockedTeacherModified,
                    format!("locked teacher {name} was changed at {slot} by regeneration"),
                )
                .with_teacher(name.clone())
                .with_slots(vec![slot]),
            );
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ConstraintSnapshot, Day, Entry, GradeCell, GradeSchedule, StudyHallAssignment, Teacher,
        TeacherSchedule, TimeSlot,
    };

    fn slot(day: Day, period: u8) -> TimeSlot {
        TimeSlot::new(day, period)
    }

    fn snapshot() -> ConstraintSnapshot {
        ConstraintSnapshot::new()
            .with_teacher(Teacher::full_time("A"))
            .with_teacher(Teacher::full_time("B"))
            .with_teacher(Teacher::full_time("C"))
    }

    /// A and B co-teach 5th Math at Mon 1; C supervises 6th study hall.
    fn sample_original() -> ScheduleOption {
        let mut option = ScheduleOption::new()
            .with_group("5th")
            .with_group("6th")
            .with_teacher(
                "A",
                TeacherSchedule::new().with_entry(slot(Day::Mon, 1), Entry::class("5th", "Math")),
            )
            .with_teacher(
                "B",
                TeacherSchedule::new()
                    .with_entry(slot(Day::Mon, 1), Entry::class("5th", "Math"))
                    .with_entry(slot(Day::Tues, 2), Entry::class("6th", "Art")),
            )
            .with_teacher(
                "C",
                TeacherSchedule::new().with_entry(slot(Day::Wed, 3), Entry::study_hall("6th")),
            )
            .with_study_hall_assignment(StudyHallAssignment::placed("6th", "C", slot(Day::Wed, 3)))
            .with_study_hall_assignment(StudyHallAssignment::unplaced("5th"))
            .with_mirror_from_teachers();
        stats::recompute(&mut option, &snapshot());
        option
    }

    /// Solver output: B's Art moved to Thurs 4 and a 5th study hall added.
    fn sample_regenerated() -> ScheduleOption {
        let original = sample_original();
        let mut option = original.clone();
        let b = option.teacher_schedules.get_mut("B").unwrap();
        b.set(slot(Day::Tues, 2), Entry::open());
        b.set(slot(Day::Thurs, 4), Entry::class("6th", "Art"));
        b.set(slot(Day::Fri, 5), Entry::study_hall("5th"));
        option.study_hall_assignments = vec![
            StudyHallAssignment::placed("6th", "C", slot(Day::Wed, 3)),
            StudyHallAssignment::placed("5th", "B", slot(Day::Fri, 5)),
        ];
        let mut option = option.with_mirror_from_teachers();
        stats::recompute(&mut option, &snapshot());
        option
    }

    #[test]
    fn test_empty_subset_is_identity() {
        let original = sample_original();
        let outcome = merge_regenerated(&original, &sample_regenerated(), &[]);
        assert_eq!(outcome.option, original);
    }

    #[test]
    fn test_subset_overwrites_only_regenerated_teachers() {
        let original = sample_original();
        let regenerated = sample_regenerated();
        let outcome = merge_regenerated(&original, &regenerated, &["B".to_string()]);

        assert!(outcome.is_clean());
        let merged = &outcome.option;
        assert_eq!(merged.teacher("B"), regenerated.teacher("B"));
        assert_eq!(merged.teacher("A"), original.teacher("A"));
        assert_eq!(merged.teacher("C"), original.teacher("C"));

        // Art moved in the mirror.
        assert!(merged.grade_schedules["6th"].get(slot(Day::Tues, 2)).is_none());
        assert_eq!(
            merged.grade_schedules["6th"].get(slot(Day::Thurs, 4)),
            Some(&GradeCell::Class {
                teacher: "B".into(),
                subject: "Art".into()
            })
        );

        // Study halls: C's record kept, the unplaced 5th replaced by B's.
        assert_eq!(
            merged.study_hall_assignments,
            vec![
                StudyHallAssignment::placed("6th", "C", slot(Day::Wed, 3)),
                StudyHallAssignment::placed("5th", "B", slot(Day::Fri, 5)),
            ]
        );
        assert_eq!(merged.study_halls_placed, 2);
        assert_eq!(merged.teacher_stats["B"], regenerated.teacher_stats["B"]);
    }

    #[test]
    fn test_mirror_keeps_locked_cells() {
        // The solver's mirror is not trusted for locked teachers.
        let original = sample_original();
        let mut regenerated = sample_regenerated();
        regenerated
            .grade_schedules
            .insert("6th".to_string(), GradeSchedule::new());

        let outcome = merge_regenerated(&original, &regenerated, &["B".to_string()]);
        let cell = outcome.option.grade_schedules["6th"]
            .get(slot(Day::Wed, 3))
            .unwrap();
        assert_eq!(cell.teacher(), "C");
        assert!(cell.is_study_hall());
        // B's old Art cell is gone even though nothing replaced it.
        assert!(outcome.option.grade_schedules["6th"]
            .get(slot(Day::Tues, 2))
            .is_none());
    }

    #[test]
    fn test_locked_teacher_modified_per_slot() {
        let original = sample_original();
        let mut regenerated = sample_regenerated();
        let c = regenerated.teacher_schedules.get_mut("C").unwrap();
        c.set(slot(Day::Wed, 3), Entry::open());
        c.set(slot(Day::Wed, 4), Entry::study_hall("6th"));

        let outcome = merge_regenerated(&original, &regenerated, &["B".to_string()]);
        let modified: Vec<_> = outcome
            .integrity
            .iter()
            .filter(|e| e.kind == ValidationKind::LockedTeacherModified)
            .collect();
        assert_eq!(modified.len(), 2);
        assert!(modified.iter().all(|e| e.teacher.as_deref() == Some("C")));
        assert!(!outcome
            .integrity
            .iter()
            .any(|e| e.kind == ValidationKind::LockedTeacherMissing));
        // The merged grid still carries the original.
        assert_eq!(outcome.option.teacher("C"), original.teacher("C"));
    }

    #[test]
    fn test_locked_teacher_missing() {
        let original = sample_original();
        let mut regenerated = sample_regenerated();
        regenerated.teacher_schedules.remove("A");

        let outcome = merge_regenerated(&original, &regenerated, &["B".to_string()]);
        assert_eq!(outcome.integrity.len(), 1);
        assert_eq!(outcome.integrity[0].kind, ValidationKind::LockedTeacherMissing);
        assert_eq!(outcome.option.teacher("A"), original.teacher("A"));
    }

    #[test]
    fn test_subset_teacher_absent_from_output_keeps_original() {
        let original = sample_original();
        let mut regenerated = sample_regenerated();
        regenerated.teacher_schedules.remove("B");

        let outcome = merge_regenerated(&original, &regenerated, &["B".to_string()]);
        assert_eq!(outcome.option.teacher("B"), original.teacher("B"));
        assert!(outcome.is_clean());
    }
}
