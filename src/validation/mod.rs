//! Timetable validation.
//!
//! Runs every rule over a complete option and reports all findings at once;
//! nothing fails fast. Findings fall into three tiers:
//!
//! | Severity | Kinds | Commit |
//! |----------|-------|--------|
//! | Hard | conflicts, counts, coverage, restrictions, unplaced | blocked |
//! | Warning | `back_to_back` | allowed |
//! | Integrity | `locked_teacher_*` | blocked; solver defect |
//!
//! Teacher grids are authoritative for every check. The group mirror is
//! consulted only to resolve labels into groups.

mod preflight;

pub use preflight::preflight;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::info;

use crate::freeform::FreeformState;
use crate::models::{
    ConstraintSnapshot, Day, Entry, ScheduleOption, TimeSlot, NO_BTB_OPEN, NO_DUPLICATE_SUBJECTS,
    STUDY_HALL_DISTRIBUTION,
};

/// Validation finding category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    /// Several placements on one teacher cell.
    TeacherConflict,
    /// Several incompatible classes for one group at one slot.
    GradeConflict,
    /// A group has the same subject twice on one day.
    SubjectConflict,
    /// An entry's group label matches no group at all.
    Consistency,
    /// A class does not meet its weekly frequency.
    SessionCount,
    /// A required group has no study hall.
    StudyHallCoverage,
    /// A pinned class is off its fixed slots.
    FixedSlotViolation,
    /// A class sits outside its allowed days or periods.
    AvailabilityViolation,
    /// Too many consecutive open periods for a full-time teacher.
    BackToBack,
    /// Co-taught classes are not aligned.
    CoTaught,
    /// A locked teacher's grid changed during regeneration.
    LockedTeacherModified,
    /// A locked teacher vanished during regeneration.
    LockedTeacherMissing,
    /// A floating block has no placement.
    Unplaced,
}

/// How a finding affects commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks commit.
    Hard,
    /// Shown, but commit is allowed.
    Warning,
    /// Blocks commit; caused by the solver, not the user.
    Integrity,
}

impl ValidationKind {
    /// Severity of the kind.
    pub fn severity(self) -> Severity {
        match self {
            ValidationKind::BackToBack => Severity::Warning,
            ValidationKind::LockedTeacherModified | ValidationKind::LockedTeacherMissing => {
                Severity::Integrity
            }
            _ => Severity::Hard,
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationKind::TeacherConflict => "teacher_conflict",
            ValidationKind::GradeConflict => "grade_conflict",
            ValidationKind::SubjectConflict => "subject_conflict",
            ValidationKind::Consistency => "consistency",
            ValidationKind::SessionCount => "session_count",
            ValidationKind::StudyHallCoverage => "study_hall_coverage",
            ValidationKind::FixedSlotViolation => "fixed_slot_violation",
            ValidationKind::AvailabilityViolation => "availability_violation",
            ValidationKind::BackToBack => "back_to_back",
            ValidationKind::CoTaught => "co_taught",
            ValidationKind::LockedTeacherModified => "locked_teacher_modified",
            ValidationKind::LockedTeacherMissing => "locked_teacher_missing",
            ValidationKind::Unplaced => "unplaced",
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Finding category.
    pub kind: ValidationKind,
    /// Human-readable description.
    pub message: String,
    /// Implicated teacher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    /// Implicated group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Implicated subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Implicated slots.
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
}

impl ValidationError {
    /// Creates a finding.
    pub fn new(kind: ValidationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            teacher: None,
            group: None,
            subject: None,
            slots: Vec::new(),
        }
    }

    /// Sets the teacher.
    pub fn with_teacher(mut self, teacher: impl Into<String>) -> Self {
        self.teacher = Some(teacher.into());
        self
    }

    /// Sets the group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the slots.
    pub fn with_slots(mut self, slots: Vec<TimeSlot>) -> Self {
        self.slots = slots;
        self
    }

    /// Severity of this finding.
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

/// All findings of one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Wraps a list of findings.
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// All findings in check order.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Findings of one kind.
    pub fn of_kind(&self, kind: ValidationKind) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    fn of_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.severity() == severity)
    }

    /// Commit-blocking user-facing findings.
    pub fn hard(&self) -> impl Iterator<Item = &ValidationError> {
        self.of_severity(Severity::Hard)
    }

    /// Soft findings.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationError> {
        self.of_severity(Severity::Warning)
    }

    /// Solver-defect findings.
    pub fn integrity(&self) -> impl Iterator<Item = &ValidationError> {
        self.of_severity(Severity::Integrity)
    }

    /// Number of findings that block commit.
    pub fn blocking_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| e.severity() != Severity::Warning)
            .count()
    }

    /// Whether commit is allowed.
    pub fn can_commit(&self) -> bool {
        self.blocking_count() == 0
    }

    /// Whether there are no findings at all.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

/// A class entry found in a teacher grid.
#[derive(Debug, Clone)]
struct ClassOccurrence<'a> {
    teacher: &'a str,
    slot: TimeSlot,
    label: &'a str,
    subject: &'a str,
    groups: BTreeSet<String>,
    elective: bool,
}

impl ClassOccurrence<'_> {
    /// Co-taught classes and elective pairs may share a group slot.
    fn compatible_with(&self, other: &ClassOccurrence<'_>) -> bool {
        (self.elective && other.elective)
            || (self.subject == other.subject && self.teacher != other.teacher)
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.subject, self.teacher)
    }
}

/// Validation run configuration.
///
/// # Example
/// ```
/// use u_timetable::models::{ConstraintSnapshot, ScheduleOption};
/// use u_timetable::validation::Validator;
///
/// let snapshot = ConstraintSnapshot::new();
/// let report = Validator::new(&snapshot).run(&ScheduleOption::new());
/// assert!(report.can_commit());
/// ```
#[derive(Debug, Clone)]
pub struct Validator<'a> {
    snapshot: &'a ConstraintSnapshot,
    freeform: Option<&'a FreeformState>,
    integrity: Vec<ValidationError>,
}

impl<'a> Validator<'a> {
    /// Validates against a constraint snapshot.
    pub fn new(snapshot: &'a ConstraintSnapshot) -> Self {
        Self {
            snapshot,
            freeform: None,
            integrity: Vec::new(),
        }
    }

    /// Includes in-flight freeform state (stacked and unplaced blocks).
    pub fn with_freeform(mut self, state: &'a FreeformState) -> Self {
        self.freeform = Some(state);
        self
    }

    /// Includes integrity findings from a regeneration merge.
    pub fn with_integrity(mut self, errors: Vec<ValidationError>) -> Self {
        self.integrity = errors;
        self
    }

    /// Runs every check.
    pub fn run(&self, option: &ScheduleOption) -> ValidationReport {
        let occurrences = self.class_occurrences(option);
        let mut errors = Vec::new();

        self.check_teacher_conflicts(&mut errors);
        check_grade_conflicts(&occurrences, &mut errors);
        self.check_subject_conflicts(&occurrences, &mut errors);
        check_consistency(option, &mut errors);
        self.check_session_counts(&occurrences, &mut errors);
        self.check_study_hall_coverage(option, &mut errors);
        self.check_fixed_slots(&occurrences, &mut errors);
        self.check_availability(&occurrences, &mut errors);
        self.check_co_taught(&occurrences, &mut errors);
        self.check_back_to_back(option, &mut errors);
        errors.extend(self.integrity.iter().cloned());
        self.check_unplaced(&mut errors);

        let report = ValidationReport::new(errors);
        info!(
            total = report.len(),
            blocking = report.blocking_count(),
            warnings = report.warnings().count(),
            "validation finished"
        );
        report
    }

    fn class_occurrences<'o>(&self, option: &'o ScheduleOption) -> Vec<ClassOccurrence<'o>> {
        let mut out = Vec::new();
        for (teacher, schedule) in &option.teacher_schedules {
            for (slot, entry) in schedule.iter() {
                let Entry::Class { group, subject } = entry else {
                    continue;
                };
                let elective = self
                    .snapshot
                    .find_class(teacher, group, subject)
                    .is_some_and(|c| c.is_elective);
                out.push(ClassOccurrence {
                    teacher,
                    slot,
                    label: group,
                    subject,
                    groups: option.covered_groups(group),
                    elective,
                });
            }
        }
        out
    }

    fn check_teacher_conflicts(&self, errors: &mut Vec<ValidationError>) {
        let Some(state) = self.freeform else {
            return;
        };
        for (cell, blocks) in state.stacked_cells() {
            errors.push(
                ValidationError::new(
                    ValidationKind::TeacherConflict,
                    format!(
                        "{} has {} blocks placed at {}",
                        cell.teacher,
                        blocks.len(),
                        cell.slot
                    ),
                )
                .with_teacher(cell.teacher.clone())
                .with_slots(vec![cell.slot]),
            );
        }
    }

    fn check_subject_conflicts(
        &self,
        occurrences: &[ClassOccurrence<'_>],
        errors: &mut Vec<ValidationError>,
    ) {
        if !self.snapshot.rules.is_enabled(NO_DUPLICATE_SUBJECTS) {
            return;
        }
        let mut by_day: BTreeMap<(&str, Day, &str), BTreeSet<TimeSlot>> = BTreeMap::new();
        for occ in occurrences.iter().filter(|o| !o.elective) {
            for group in &occ.groups {
                by_day
                    .entry((group.as_str(), occ.slot.day, occ.subject))
                    .or_default()
                    .insert(occ.slot);
            }
        }
        for ((group, day, subject), slots) in by_day {
            if slots.len() > 1 {
                errors.push(
                    ValidationError::new(
                        ValidationKind::SubjectConflict,
                        format!("{group} has {subject} {} times on {day}", slots.len()),
                    )
                    .with_group(group)
                    .with_subject(subject)
                    .with_slots(slots.into_iter().collect()),
                );
            }
        }
    }

    fn check_session_counts(
        &self,
        occurrences: &[ClassOccurrence<'_>],
        errors: &mut Vec<ValidationError>,
    ) {
        let mut expected: BTreeMap<(&str, String, &str), u32> = BTreeMap::new();
        for class in &self.snapshot.classes {
            if class.teacher.trim().is_empty() || class.subject.trim().is_empty() {
                continue;
            }
            let want = expected
                .entry((
                    class.teacher.as_str(),
                    self.snapshot.class_label(class),
                    class.subject.as_str(),
                ))
                .or_insert(0);
            *want = want.saturating_add(class.weekly_sessions());
        }

        for ((teacher, label, subject), want) in expected {
            let slots: Vec<TimeSlot> = occurrences
                .iter()
                .filter(|o| o.teacher == teacher && o.label == label && o.subject == subject)
                .map(|o| o.slot)
                .collect();
            let actual = slots.len() as u32;
            if actual != want {
                errors.push(
                    ValidationError::new(
                        ValidationKind::SessionCount,
                        format!(
                            "{teacher} teaches {label} {subject}: expected {want}, actual {actual}"
                        ),
                    )
                    .with_teacher(teacher)
                    .with_group(label)
                    .with_subject(subject)
                    .with_slots(slots),
                );
            }
        }
    }

    fn check_study_hall_coverage(
        &self,
        option: &ScheduleOption,
        errors: &mut Vec<ValidationError>,
    ) {
        let rules = &self.snapshot.rules;
        if !rules.is_enabled(STUDY_HALL_DISTRIBUTION) {
            return;
        }
        for grade in rules.study_hall_grades() {
            let covered = option.teacher_schedules.values().any(|schedule| {
                schedule.iter().any(|(_, e)| match e {
                    Entry::StudyHall { group } => {
                        group == &grade || option.covered_groups(group).contains(&grade)
                    }
                    _ => false,
                })
            });
            if !covered {
                errors.push(
                    ValidationError::new(
                        ValidationKind::StudyHallCoverage,
                        format!("{grade} has no study hall"),
                    )
                    .with_group(grade),
                );
            }
        }
    }

    fn check_fixed_slots(
        &self,
        occurrences: &[ClassOccurrence<'_>],
        errors: &mut Vec<ValidationError>,
    ) {
        for class in self.snapshot.classes.iter().filter(|c| c.is_fixed()) {
            let label = self.snapshot.class_label(class);
            let found: BTreeSet<TimeSlot> = occurrences
                .iter()
                .filter(|o| {
                    o.teacher == class.teacher && o.label == label && o.subject == class.subject
                })
                .map(|o| o.slot)
                .collect();
            let pinned: BTreeSet<TimeSlot> = class.fixed_slots.iter().copied().collect();

            let stray: Vec<TimeSlot> = found.difference(&pinned).copied().collect();
            let missing: Vec<TimeSlot> = pinned.difference(&found).copied().collect();
            if stray.is_empty() && missing.is_empty() {
                continue;
            }
            let mut parts = Vec::new();
            if !stray.is_empty() {
                parts.push(format!("scheduled at {}", join_slots(&stray)));
            }
            if !missing.is_empty() {
                parts.push(format!("missing from {}", join_slots(&missing)));
            }
            errors.push(
                ValidationError::new(
                    ValidationKind::FixedSlotViolation,
                    format!(
                        "{} {} {} is pinned to {} but {}",
                        class.teacher,
                        label,
                        class.subject,
                        join_slots(&class.fixed_slots),
                        parts.join(" and ")
                    ),
                )
                .with_teacher(class.teacher.clone())
                .with_group(label)
                .with_subject(class.subject.clone())
                .with_slots(stray.into_iter().chain(missing).collect()),
            );
        }
    }

    fn check_availability(
        &self,
        occurrences: &[ClassOccurrence<'_>],
        errors: &mut Vec<ValidationError>,
    ) {
        for occ in occurrences {
            let Some(class) = self.snapshot.find_class(occ.teacher, occ.label, occ.subject) else {
                continue;
            };
            if class.allows(occ.slot) {
                continue;
            }
            errors.push(
                ValidationError::new(
                    ValidationKind::AvailabilityViolation,
                    format!(
                        "{} {} {} is not available at {}",
                        occ.teacher, occ.label, occ.subject, occ.slot
                    ),
                )
                .with_teacher(occ.teacher)
                .with_group(occ.label)
                .with_subject(occ.subject)
                .with_slots(vec![occ.slot]),
            );
        }
    }

    fn check_co_taught(
        &self,
        occurrences: &[ClassOccurrence<'_>],
        errors: &mut Vec<ValidationError>,
    ) {
        let mut teams: BTreeMap<(String, &str), BTreeSet<&str>> = BTreeMap::new();
        for class in self.snapshot.classes.iter().filter(|c| !c.is_elective) {
            teams
                .entry((self.snapshot.class_label(class), class.subject.as_str()))
                .or_default()
                .insert(class.teacher.as_str());
        }

        for ((label, subject), teachers) in teams {
            if teachers.len() < 2 {
                continue;
            }
            let slot_sets: Vec<BTreeSet<TimeSlot>> = teachers
                .iter()
                .map(|t| {
                    occurrences
                        .iter()
                        .filter(|o| o.teacher == *t && o.label == label && o.subject == subject)
                        .map(|o| o.slot)
                        .collect()
                })
                .collect();
            let union: BTreeSet<TimeSlot> = slot_sets.iter().flatten().copied().collect();
            let shared: BTreeSet<TimeSlot> = union
                .iter()
                .filter(|s| slot_sets.iter().all(|set| set.contains(*s)))
                .copied()
                .collect();
            let misaligned: Vec<TimeSlot> = union.difference(&shared).copied().collect();
            if misaligned.is_empty() {
                continue;
            }
            let names: Vec<&str> = teachers.into_iter().collect();
            errors.push(
                ValidationError::new(
                    ValidationKind::CoTaught,
                    format!(
                        "{label} {subject} is co-taught by {} but not aligned at {}",
                        names.join(", "),
                        join_slots(&misaligned)
                    ),
                )
                .with_group(label)
                .with_subject(subject)
                .with_slots(misaligned),
            );
        }
    }

    fn check_back_to_back(&self, option: &ScheduleOption, errors: &mut Vec<ValidationError>) {
        let rules = &self.snapshot.rules;
        if !rules.is_enabled(NO_BTB_OPEN) {
            return;
        }
        let threshold = rules.back_to_back_threshold();
        for (teacher, schedule) in &option.teacher_schedules {
            if !self.snapshot.is_full_time(teacher) {
                continue;
            }
            let mut pair_ends = Vec::new();
            for day in Day::ALL {
                let mut prev_open = false;
                for (slot, entry) in schedule.day(day) {
                    let open = entry.is_open_like();
                    if open && prev_open {
                        pair_ends.push(slot);
                    }
                    prev_open = open;
                }
            }
            if pair_ends.len() as u32 >= threshold {
                errors.push(
                    ValidationError::new(
                        ValidationKind::BackToBack,
                        format!(
                            "{teacher} has {} back-to-back open periods (threshold {threshold})",
                            pair_ends.len()
                        ),
                    )
                    .with_teacher(teacher.clone())
                    .with_slots(pair_ends),
                );
            }
        }
    }

    fn check_unplaced(&self, errors: &mut Vec<ValidationError>) {
        let Some(state) = self.freeform else {
            return;
        };
        for block in state.unplaced() {
            let what = block.subject.as_deref().unwrap_or(block.payload.label());
            errors.push(
                ValidationError::new(
                    ValidationKind::Unplaced,
                    format!(
                        "block #{} ({} {} from {} {}) is not placed",
                        block.id, block.group, what, block.source.teacher, block.source.slot
                    ),
                )
                .with_teacher(block.source.teacher.clone())
                .with_group(block.group.clone())
                .with_slots(vec![block.source.slot]),
            );
        }
    }
}

fn check_grade_conflicts(occurrences: &[ClassOccurrence<'_>], errors: &mut Vec<ValidationError>) {
    let mut by_cell: BTreeMap<(&str, TimeSlot), Vec<&ClassOccurrence<'_>>> = BTreeMap::new();
    for occ in occurrences {
        for group in &occ.groups {
            by_cell.entry((group.as_str(), occ.slot)).or_default().push(occ);
        }
    }
    for ((group, slot), occs) in by_cell {
        let clash = occs.iter().enumerate().any(|(i, a)| {
            occs[i + 1..].iter().any(|b| !a.compatible_with(b))
        });
        if !clash {
            continue;
        }
        let listed: Vec<String> = occs.iter().map(|o| o.describe()).collect();
        errors.push(
            ValidationError::new(
                ValidationKind::GradeConflict,
                format!("{group} has {} classes at {slot}: {}", occs.len(), listed.join(", ")),
            )
            .with_group(group)
            .with_slots(vec![slot]),
        );
    }
}

fn check_consistency(option: &ScheduleOption, errors: &mut Vec<ValidationError>) {
    for (teacher, schedule) in &option.teacher_schedules {
        let mut unresolved: BTreeMap<&str, Vec<TimeSlot>> = BTreeMap::new();
        for (slot, entry) in schedule.iter() {
            let Some(group) = entry.group() else {
                continue;
            };
            if option.resolve_groups(group).is_empty() {
                unresolved.entry(group).or_default().push(slot);
            }
        }
        for (group, slots) in unresolved {
            errors.push(
                ValidationError::new(
                    ValidationKind::Consistency,
                    format!(
                        "{teacher}: group '{group}' at {} matches no group schedule",
                        join_slots(&slots)
                    ),
                )
                .with_teacher(teacher.clone())
                .with_group(group)
                .with_slots(slots),
            );
        }
    }
}

fn join_slots(slots: &[TimeSlot]) -> String {
    slots
        .iter()
        .map(TimeSlot::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates an option with no in-flight edit state.
pub fn validate(option: &ScheduleOption, snapshot: &ConstraintSnapshot) -> ValidationReport {
    Validator::new(snapshot).run(option)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ClassDefinition, Rule, RuleSet, Teacher, TeacherSchedule, STUDY_HALL_GRADES,
    };
    use crate::swap::CellRef;
    use serde_json::json;

    fn slot(day: Day, period: u8) -> TimeSlot {
        TimeSlot::new(day, period)
    }

    fn kinds(report: &ValidationReport) -> Vec<ValidationKind> {
        report.errors().iter().map(|e| e.kind).collect()
    }

    fn sample_snapshot() -> ConstraintSnapshot {
        ConstraintSnapshot::new()
            .with_teacher(Teacher::part_time("T"))
            .with_teacher(Teacher::part_time("U"))
            .with_class(ClassDefinition::new("T", "5th", "Math", 3))
            .with_class(ClassDefinition::new("U", "6th", "Art", 1))
            .with_grades(vec!["5th".into(), "6th".into()])
    }

    fn sample_option() -> ScheduleOption {
        ScheduleOption::new()
            .with_group("5th")
            .with_group("6th")
            .with_teacher(
                "T",
                TeacherSchedule::new()
                    .with_entry(slot(Day::Mon, 1), Entry::class("5th", "Math"))
                    .with_entry(slot(Day::Tues, 1), Entry::class("5th", "Math"))
                    .with_entry(slot(Day::Wed, 1), Entry::class("5th", "Math")),
            )
            .with_teacher(
                "U",
                TeacherSchedule::new().with_entry(slot(Day::Mon, 2), Entry::class("6th", "Art")),
            )
            .with_mirror_from_teachers()
    }

    #[test]
    fn test_clean_option_has_no_findings() {
        let report = validate(&sample_option(), &sample_snapshot());
        assert!(report.is_empty(), "{:?}", report.errors());
        assert!(report.can_commit());
    }

    #[test]
    fn test_pick_up_without_placement_scenario() {
        let mut option = sample_option();
        let snapshot = sample_snapshot();
        let mut state = FreeformState::new();
        state
            .pick_up(&mut option, &CellRef::new("T", slot(Day::Mon, 1)))
            .unwrap();

        let report = Validator::new(&snapshot).with_freeform(&state).run(&option);
        assert_eq!(
            kinds(&report),
            vec![ValidationKind::SessionCount, ValidationKind::Unplaced]
        );
        let sc = report.of_kind(ValidationKind::SessionCount).next().unwrap();
        assert_eq!(sc.teacher.as_deref(), Some("T"));
        assert_eq!(sc.group.as_deref(), Some("5th"));
        assert_eq!(sc.subject.as_deref(), Some("Math"));
        assert!(sc.message.contains("expected 3, actual 2"));
        assert!(!report.can_commit());
    }

    #[test]
    fn test_grade_conflict_respects_electives_and_co_teaching() {
        let snapshot = sample_snapshot()
            .with_class(ClassDefinition::new("U", "5th", "Band", 1).elective())
            .with_class(ClassDefinition::new("V", "5th", "Choir", 1).elective());
        let base = sample_option().with_teacher("V", TeacherSchedule::new());

        // Two electives share a slot: fine.
        let mut ok = base.clone();
        ok.teacher_schedules
            .get_mut("U")
            .unwrap()
            .set(slot(Day::Fri, 1), Entry::class("5th", "Band"));
        ok.teacher_schedules
            .get_mut("V")
            .unwrap()
            .set(slot(Day::Fri, 1), Entry::class("5th", "Choir"));
        let report = validate(&ok, &snapshot);
        assert_eq!(report.of_kind(ValidationKind::GradeConflict).count(), 0);

        // Elective against a regular class: conflict.
        let mut bad = base;
        bad.teacher_schedules
            .get_mut("U")
            .unwrap()
            .set(slot(Day::Mon, 1), Entry::class("5th", "Band"));
        let report = validate(&bad, &snapshot);
        let conflicts: Vec<_> = report.of_kind(ValidationKind::GradeConflict).collect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].slots, vec![slot(Day::Mon, 1)]);
    }

    #[test]
    fn test_shared_slots_are_not_inconsistent() {
        let snapshot = sample_snapshot()
            .with_teacher(Teacher::part_time("V"))
            .with_class(ClassDefinition::new("U", "5th", "Math", 3))
            .with_class(ClassDefinition::new("U", "5th", "Band", 1).elective())
            .with_class(ClassDefinition::new("V", "5th", "Choir", 1).elective());
        let mut u = TeacherSchedule::new()
            .with_entry(slot(Day::Mon, 2), Entry::class("6th", "Art"))
            .with_entry(slot(Day::Fri, 1), Entry::class("5th", "Band"));
        for day in [Day::Mon, Day::Tues, Day::Wed] {
            u.set(slot(day, 1), Entry::class("5th", "Math"));
        }
        let v = TeacherSchedule::new().with_entry(slot(Day::Fri, 1), Entry::class("5th", "Choir"));
        let option = sample_option()
            .with_teacher("U", u)
            .with_teacher("V", v)
            .with_mirror_from_teachers();

        // The mirror keeps one occupant per shared slot.
        let fifth = &option.grade_schedules["5th"];
        assert_eq!(fifth.get(slot(Day::Mon, 1)).map(|c| c.teacher()), Some("U"));
        assert_eq!(fifth.get(slot(Day::Fri, 1)).map(|c| c.teacher()), Some("V"));

        let report = validate(&option, &snapshot);
        assert_eq!(report.of_kind(ValidationKind::Consistency).count(), 0);
        assert_eq!(report.of_kind(ValidationKind::GradeConflict).count(), 0);
        assert_eq!(report.of_kind(ValidationKind::CoTaught).count(), 0);
        assert!(report.can_commit(), "{:?}", report.errors());
    }

    #[test]
    fn test_multi_grade_class_matches_grid_label() {
        let grades: Vec<String> = vec!["6th Grade".into(), "7th Grade".into(), "8th Grade".into()];
        let art = ClassDefinition::new("T", "8th Grade", "Art", 1)
            .with_grades(vec!["8th Grade".into(), "6th Grade".into()]);
        let snapshot = ConstraintSnapshot::new()
            .with_teacher(Teacher::part_time("T"))
            .with_class(art.clone())
            .with_grades(grades.clone());
        let grid = TeacherSchedule::new()
            .with_entry(slot(Day::Mon, 1), Entry::class("6th-8th Grade", "Art"));
        let mut option = ScheduleOption::new().with_teacher("T", grid);
        for grade in &grades {
            option = option.with_group(grade.as_str());
        }
        let option = option.with_mirror_from_teachers();

        let report = validate(&option, &snapshot);
        assert_eq!(report.of_kind(ValidationKind::SessionCount).count(), 0);
        assert!(report.can_commit(), "{:?}", report.errors());

        // The class is found, so its availability is enforced.
        let friday_only = ConstraintSnapshot::new()
            .with_teacher(Teacher::part_time("T"))
            .with_class(art.with_available_days(vec![Day::Fri]))
            .with_grades(grades);
        let report = validate(&option, &friday_only);
        assert_eq!(report.of_kind(ValidationKind::AvailabilityViolation).count(), 1);
    }

    #[test]
    fn test_subject_conflict_gated_by_rule() {
        let mut option = sample_option();
        option
            .teacher_schedules
            .get_mut("T")
            .unwrap()
            .set(slot(Day::Mon, 4), Entry::class("5th", "Math"));
        let report = validate(&option, &sample_snapshot());
        assert_eq!(report.of_kind(ValidationKind::SubjectConflict).count(), 1);

        let relaxed = sample_snapshot()
            .with_rules(RuleSet::new().with_rule(Rule::disabled(NO_DUPLICATE_SUBJECTS)));
        let report = validate(&option, &relaxed);
        assert_eq!(report.of_kind(ValidationKind::SubjectConflict).count(), 0);
        // Four Math sessions against three expected.
        assert_eq!(report.of_kind(ValidationKind::SessionCount).count(), 1);
    }

    #[test]
    fn test_consistency_only_for_unresolvable_labels() {
        let mut option = sample_option();
        option
            .teacher_schedules
            .get_mut("U")
            .unwrap()
            .set(slot(Day::Thurs, 2), Entry::study_hall("Staff"));
        let report = validate(&option, &sample_snapshot());
        let found: Vec<_> = report.of_kind(ValidationKind::Consistency).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].group.as_deref(), Some("Staff"));
    }

    #[test]
    fn test_study_hall_coverage() {
        let snapshot = sample_snapshot().with_rules(RuleSet::new().with_rule(
            Rule::enabled(STUDY_HALL_GRADES).with_config(json!({ "grades": ["5th", "6th"] })),
        ));
        let mut option = sample_option();
        option
            .teacher_schedules
            .get_mut("U")
            .unwrap()
            .set(slot(Day::Fri, 2), Entry::study_hall("6th"));

        let report = validate(&option, &snapshot);
        let missing: Vec<_> = report.of_kind(ValidationKind::StudyHallCoverage).collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].group.as_deref(), Some("5th"));
    }

    #[test]
    fn test_fixed_slot_and_availability() {
        let snapshot = ConstraintSnapshot::new()
            .with_class(
                ClassDefinition::new("T", "5th", "Math", 3).with_fixed_slots(vec![
                    slot(Day::Mon, 1),
                    slot(Day::Tues, 1),
                    slot(Day::Thurs, 1),
                ]),
            )
            .with_class(
                ClassDefinition::new("U", "6th", "Art", 1).with_available_days(vec![Day::Fri]),
            );
        let report = validate(&sample_option(), &snapshot);

        let fixed: Vec<_> = report.of_kind(ValidationKind::FixedSlotViolation).collect();
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0].slots, vec![slot(Day::Wed, 1), slot(Day::Thurs, 1)]);

        let avail: Vec<_> = report.of_kind(ValidationKind::AvailabilityViolation).collect();
        assert_eq!(avail.len(), 1);
        assert_eq!(avail[0].slots, vec![slot(Day::Mon, 2)]);
    }

    #[test]
    fn test_co_taught_alignment() {
        let snapshot = sample_snapshot().with_class(ClassDefinition::new("U", "5th", "Math", 3));
        let mut option = sample_option();
        {
            let u = option.teacher_schedules.get_mut("U").unwrap();
            u.set(slot(Day::Mon, 1), Entry::class("5th", "Math"));
            u.set(slot(Day::Tues, 1), Entry::class("5th", "Math"));
            u.set(slot(Day::Thurs, 1), Entry::class("5th", "Math"));
        }
        let report = validate(&option, &snapshot);
        let co: Vec<_> = report.of_kind(ValidationKind::CoTaught).collect();
        assert_eq!(co.len(), 1);
        assert_eq!(co[0].slots, vec![slot(Day::Wed, 1), slot(Day::Thurs, 1)]);
        // Aligned slots are not grade conflicts.
        assert_eq!(report.of_kind(ValidationKind::GradeConflict).count(), 0);
    }

    #[test]
    fn test_back_to_back_is_warning() {
        let snapshot = sample_snapshot().with_teacher(Teacher::full_time("F"));
        let mut grid = TeacherSchedule::new();
        for ts in TimeSlot::all() {
            grid.set(ts, Entry::class("6th", "Gym"));
        }
        // Three separate pairs on three days.
        for day in [Day::Mon, Day::Tues, Day::Wed] {
            grid.set(slot(day, 4), Entry::open());
            grid.set(slot(day, 5), Entry::open());
        }
        let option = sample_option().with_teacher("F", grid);

        let report = validate(&option, &snapshot);
        let warnings: Vec<_> = report.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, ValidationKind::BackToBack);
        assert_eq!(warnings[0].slots.len(), 3);

        let quiet = snapshot.with_rules(RuleSet::new().with_rule(Rule::disabled(NO_BTB_OPEN)));
        assert_eq!(validate(&option, &quiet).warnings().count(), 0);
    }

    #[test]
    fn test_integrity_findings_block_commit() {
        let report = Validator::new(&sample_snapshot())
            .with_integrity(vec![ValidationError::new(
                ValidationKind::LockedTeacherMissing,
                "U missing",
            )])
            .run(&sample_option());
        assert_eq!(report.integrity().count(), 1);
        assert_eq!(report.hard().count(), 0);
        assert!(!report.can_commit());
    }

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_value(ValidationKind::LockedTeacherModified).unwrap();
        assert_eq!(json, "locked_teacher_modified");
        assert_eq!(ValidationKind::CoTaught.to_string(), "co_taught");
        assert_eq!(ValidationKind::BackToBack.severity(), Severity::Warning);
    }
}
