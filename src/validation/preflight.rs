//! Pre-flight checks run before a regeneration request leaves the process.
//!
//! Each finding makes the request unsatisfiable, so it is cheaper to reject
//! locally than to wait for the solver to say so.
//!
//! # Checks
//! 1. Incomplete classes (no teacher, grade, or subject)
//! 2. Teacher overload: more weekly sessions than grid slots
//! 3. Grade overload: same, non-elective only, co-taught grade+subject once
//! 4. Fixed-slot clashes: one teacher pinned twice to the same slot

use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::collab::{FixedSlotConflict, IncompleteClass, LoadIssue, SolverDiagnostics};
use crate::models::{ConstraintSnapshot, TimeSlot, SLOT_COUNT};

/// Checks a snapshot for problems no timetable can satisfy.
///
/// Returns empty diagnostics when the snapshot is plausible.
pub fn preflight(snapshot: &ConstraintSnapshot) -> SolverDiagnostics {
    let mut diag = SolverDiagnostics::default();
    let max = SLOT_COUNT as u32;

    for (i, class) in snapshot.classes.iter().enumerate() {
        let mut issues = Vec::new();
        if class.teacher.trim().is_empty() {
            issues.push("no teacher".to_string());
        }
        if class.grades.is_empty() {
            issues.push("no grade".to_string());
        }
        if class.subject.trim().is_empty() {
            issues.push("no subject".to_string());
        }
        if issues.is_empty() {
            continue;
        }
        diag.preflight_errors.push(format!(
            "Class #{} ({} - {}): {}",
            i + 1,
            or_placeholder(&class.teacher, "no teacher"),
            or_placeholder(&class.subject, "no subject"),
            issues.join(", ")
        ));
        diag.incomplete_classes.push(IncompleteClass {
            index: i + 1,
            teacher: class.teacher.clone(),
            subject: class.subject.clone(),
            issues,
        });
    }

    let mut teacher_load: BTreeMap<&str, u32> = BTreeMap::new();
    for class in &snapshot.classes {
        let load = teacher_load.entry(class.teacher.as_str()).or_insert(0);
        *load = load.saturating_add(class.weekly_sessions());
    }
    for (teacher, sessions) in teacher_load.into_iter().filter(|(_, n)| *n > max) {
        diag.preflight_errors.push(format!(
            "Teacher '{teacher}' has {sessions} sessions but max is {max}"
        ));
        diag.teacher_overload.push(LoadIssue {
            name: teacher.to_string(),
            sessions,
        });
    }

    let mut grade_load: BTreeMap<&str, u32> = BTreeMap::new();
    let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();
    for class in snapshot.classes.iter().filter(|c| !c.is_elective) {
        for grade in &class.grades {
            if seen.insert((grade.as_str(), class.subject.as_str())) {
                let load = grade_load.entry(grade.as_str()).or_insert(0);
                *load = load.saturating_add(class.weekly_sessions());
            }
        }
    }
    for (grade, sessions) in grade_load.into_iter().filter(|(_, n)| *n > max) {
        diag.preflight_errors.push(format!(
            "Grade '{grade}' has {sessions} sessions but max is {max}"
        ));
        diag.grade_overload.push(LoadIssue {
            name: grade.to_string(),
            sessions,
        });
    }

    let mut pinned: BTreeMap<(&str, TimeSlot), &str> = BTreeMap::new();
    for class in &snapshot.classes {
        for &slot in class.fixed_slots.iter().filter(|s| s.is_valid()) {
            match pinned.get(&(class.teacher.as_str(), slot)) {
                Some(first) => {
                    diag.preflight_errors.push(format!(
                        "Teacher '{}' has fixed slot conflict on {slot}: '{first}' and '{}'",
                        class.teacher, class.subject
                    ));
                    diag.fixed_slot_conflicts.push(FixedSlotConflict {
                        teacher: class.teacher.clone(),
                        slot,
                        first: first.to_string(),
                        second: class.subject.clone(),
                    });
                }
                None => {
                    pinned.insert((class.teacher.as_str(), slot), class.subject.as_str());
                }
            }
        }
    }

    if !diag.is_empty() {
        warn!(issues = diag.preflight_errors.len(), "pre-flight check failed");
    }
    diag
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassDefinition, Day};

    #[test]
    fn test_plausible_snapshot_passes() {
        let snapshot = ConstraintSnapshot::new()
            .with_class(ClassDefinition::new("Ana", "5th", "Math", 5))
            .with_class(ClassDefinition::new("Ana", "6th", "Math", 5));
        assert!(preflight(&snapshot).is_empty());
    }

    #[test]
    fn test_incomplete_class() {
        let snapshot = ConstraintSnapshot::new()
            .with_class(ClassDefinition::new("", "5th", "Math", 1).with_grades(vec![]));
        let diag = preflight(&snapshot);
        assert_eq!(diag.incomplete_classes.len(), 1);
        assert_eq!(diag.incomplete_classes[0].issues, vec!["no teacher", "no grade"]);
        assert!(diag.preflight_errors[0].starts_with("Class #1 (no teacher - Math)"));
    }

    #[test]
    fn test_overloads() {
        let snapshot = ConstraintSnapshot::new()
            .with_class(ClassDefinition::new("Ana", "5th", "Math", 20))
            .with_class(ClassDefinition::new("Ana", "5th", "Art", 6))
            // Co-taught with Ana's Math: not counted twice for the grade.
            .with_class(ClassDefinition::new("Bo", "5th", "Math", 20))
            // Electives never count toward a grade.
            .with_class(ClassDefinition::new("Bo", "5th", "Band", 5).elective());
        let diag = preflight(&snapshot);

        assert_eq!(
            diag.teacher_overload,
            vec![LoadIssue { name: "Ana".into(), sessions: 26 }]
        );
        assert_eq!(
            diag.grade_overload,
            vec![LoadIssue { name: "5th".into(), sessions: 26 }]
        );
        assert_eq!(diag.preflight_errors.len(), 2);
    }

    #[test]
    fn test_huge_session_counts_saturate() {
        let snapshot = ConstraintSnapshot::new()
            .with_class(ClassDefinition::new("Ana", "5th", "Math", u32::MAX))
            .with_class(ClassDefinition::new("Ana", "5th", "Art", 2));
        let diag = preflight(&snapshot);

        assert_eq!(
            diag.teacher_overload,
            vec![LoadIssue { name: "Ana".into(), sessions: u32::MAX }]
        );
        assert_eq!(
            diag.grade_overload,
            vec![LoadIssue { name: "5th".into(), sessions: u32::MAX }]
        );
    }

    #[test]
    fn test_fixed_slot_conflict() {
        let mon1 = TimeSlot::new(Day::Mon, 1);
        let snapshot = ConstraintSnapshot::new()
            .with_class(ClassDefinition::new("Ana", "5th", "Math", 1).with_fixed_slots(vec![mon1]))
            .with_class(ClassDefinition::new("Ana", "6th", "Art", 1).with_fixed_slots(vec![mon1]));
        let diag = preflight(&snapshot);
        assert_eq!(diag.fixed_slot_conflicts.len(), 1);
        assert_eq!(diag.fixed_slot_conflicts[0].first, "Math");
        assert_eq!(diag.fixed_slot_conflicts[0].second, "Art");
        assert!(diag.summary().contains("1 constraint issue"));
    }
}
