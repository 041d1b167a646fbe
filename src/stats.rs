//! Teacher load statistics.
//!
//! Derived counts stored on a [`ScheduleOption`]. They are never edited
//! directly; every commit re-derives them from the teacher grids.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | teaching | Class entries |
//! | study_hall | StudyHall entries |
//! | open | Open entries |
//! | back_to_back_issues | Consecutive open-like pairs within a day (full-time only) |
//! | spread_open_issues | Σ per day of max(0, open-like periods - 1), when `spread_open` is on |
//!
//! Open and StudyHall are both "open-like": neither is teaching load.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{
    ConstraintSnapshot, Day, EntryKind, ScheduleOption, TeacherSchedule, TeacherStats, SPREAD_OPEN,
};

/// Number of consecutive open-like pairs within a day, summed over the week.
///
/// A run of three open-like periods counts as two pairs.
pub fn back_to_back_count(schedule: &TeacherSchedule) -> u32 {
    let mut count = 0;
    for day in Day::ALL {
        let mut prev_open = false;
        for (_, entry) in schedule.day(day) {
            let open = entry.is_open_like();
            if open && prev_open {
                count += 1;
            }
            prev_open = open;
        }
    }
    count
}

/// Open-like periods beyond the first on each day, summed over the week.
pub fn spread_open_count(schedule: &TeacherSchedule) -> u32 {
    Day::ALL
        .iter()
        .map(|&day| {
            let open = schedule.day(day).filter(|(_, e)| e.is_open_like()).count() as u32;
            open.saturating_sub(1)
        })
        .sum()
}

/// Computes the stats of one teacher.
///
/// Back-to-back pairs are counted only for full-time teachers on the
/// roster; spread-open only when the `spread_open` rule is enabled.
pub fn teacher_stats(
    name: &str,
    schedule: &TeacherSchedule,
    snapshot: &ConstraintSnapshot,
) -> TeacherStats {
    let teaching = schedule.count(EntryKind::Class) as u32;
    let study_hall = schedule.count(EntryKind::StudyHall) as u32;
    let open = schedule.count(EntryKind::Open) as u32;

    let back_to_back_issues = if snapshot.is_full_time(name) {
        back_to_back_count(schedule)
    } else {
        0
    };
    let spread_open_issues = if snapshot.rules.is_enabled(SPREAD_OPEN) {
        spread_open_count(schedule)
    } else {
        0
    };

    TeacherStats {
        teacher: name.to_string(),
        status: snapshot.teacher(name).map(|t| t.status),
        teaching,
        study_hall,
        open,
        total_used: teaching + study_hall,
        back_to_back_issues,
        spread_open_issues,
    }
}

/// Recomputes every teacher's stats and the option-level aggregates.
pub fn recompute(option: &mut ScheduleOption, snapshot: &ConstraintSnapshot) {
    option.teacher_stats = option
        .teacher_schedules
        .iter()
        .map(|(name, schedule)| (name.clone(), teacher_stats(name, schedule, snapshot)))
        .collect::<BTreeMap<_, _>>();
    refresh_aggregates(option);
}

/// Recomputes the option-level aggregates from the stored per-teacher stats.
pub fn refresh_aggregates(option: &mut ScheduleOption) {
    option.back_to_back_issues = option
        .teacher_stats
        .values()
        .map(|s| s.back_to_back_issues)
        .sum();
    option.study_halls_placed = option
        .study_hall_assignments
        .iter()
        .filter(|a| a.is_placed())
        .count() as u32;
    debug!(
        back_to_back = option.back_to_back_issues,
        study_halls_placed = option.study_halls_placed,
        teachers = option.teacher_stats.len(),
        "stats refreshed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, Rule, RuleSet, StudyHallAssignment, Teacher, TimeSlot};

    fn slot(day: Day, period: u8) -> TimeSlot {
        TimeSlot::new(day, period)
    }

    /// Full week of classes except the given open-like slots.
    fn sample_schedule(open_like: &[(TimeSlot, Entry)]) -> TeacherSchedule {
        let mut s = TeacherSchedule::new();
        for ts in TimeSlot::all() {
            s.set(ts, Entry::class("5th", "Math"));
        }
        for (ts, e) in open_like {
            s.set(*ts, e.clone());
        }
        s
    }

    fn sample_snapshot() -> ConstraintSnapshot {
        ConstraintSnapshot::new()
            .with_teacher(Teacher::full_time("Ana"))
            .with_teacher(Teacher::part_time("Bo"))
    }

    #[test]
    fn test_back_to_back_counts_pairs_within_day() {
        // Mon 1-3 open-like (2 pairs), Mon 5 + Tues 1 never pair across days.
        let s = sample_schedule(&[
            (slot(Day::Mon, 1), Entry::open()),
            (slot(Day::Mon, 2), Entry::study_hall("6th")),
            (slot(Day::Mon, 3), Entry::open()),
            (slot(Day::Mon, 5), Entry::open()),
            (slot(Day::Tues, 1), Entry::open()),
        ]);
        assert_eq!(back_to_back_count(&s), 2);
        assert_eq!(spread_open_count(&s), 3);
    }

    #[test]
    fn test_teacher_stats_counts() {
        let s = sample_schedule(&[
            (slot(Day::Wed, 2), Entry::open()),
            (slot(Day::Wed, 3), Entry::open()),
            (slot(Day::Fri, 1), Entry::study_hall("6th")),
        ]);
        let snapshot = sample_snapshot();

        let ana = teacher_stats("Ana", &s, &snapshot);
        assert_eq!(ana.teaching, 22);
        assert_eq!(ana.study_hall, 1);
        assert_eq!(ana.open, 2);
        assert_eq!(ana.total_used, 23);
        assert_eq!(ana.back_to_back_issues, 1);
        assert_eq!(ana.spread_open_issues, 1);

        // Part-time teachers are exempt from back-to-back counting.
        let bo = teacher_stats("Bo", &s, &snapshot);
        assert_eq!(bo.back_to_back_issues, 0);
    }

    #[test]
    fn test_spread_open_gated_by_rule() {
        let s = sample_schedule(&[
            (slot(Day::Wed, 2), Entry::open()),
            (slot(Day::Wed, 4), Entry::open()),
        ]);
        let snapshot = sample_snapshot()
            .with_rules(RuleSet::new().with_rule(Rule::disabled(SPREAD_OPEN)));
        assert_eq!(teacher_stats("Ana", &s, &snapshot).spread_open_issues, 0);
    }

    #[test]
    fn test_recompute_aggregates() {
        let mut option = ScheduleOption::new()
            .with_teacher(
                "Ana",
                sample_schedule(&[
                    (slot(Day::Mon, 1), Entry::open()),
                    (slot(Day::Mon, 2), Entry::open()),
                ]),
            )
            .with_teacher(
                "Bo",
                sample_schedule(&[
                    (slot(Day::Mon, 1), Entry::open()),
                    (slot(Day::Mon, 2), Entry::open()),
                ]),
            )
            .with_study_hall_assignment(StudyHallAssignment::placed(
                "6th",
                "Ana",
                slot(Day::Fri, 1),
            ))
            .with_study_hall_assignment(StudyHallAssignment::unplaced("7th"));

        recompute(&mut option, &sample_snapshot());
        assert_eq!(option.teacher_stats.len(), 2);
        assert_eq!(option.back_to_back_issues, 1);
        assert_eq!(option.study_halls_placed, 1);
    }
}
