//! Swap engine.
//!
//! Finds legal targets for a selected cell and commits the exchange on a
//! fresh copy of the option. Every commit is a permutation of grid cells:
//! content moves, nothing is created or destroyed.
//!
//! # Target rules
//!
//! | Source | Target | Kind |
//! |--------|--------|------|
//! | StudyHall | Open of another eligible teacher at the same slot | `StudyHallHandOff` |
//! | Open | Open of another teacher at any slot | `OpenExchange` |
//! | Class | own Open slot, group free, no same-day subject repeat | `ClassMove` |
//! | Class | another teacher's class, both free at each other's time | `ClassExchange` |

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::error::{EditError, EditResult};
use crate::models::{ConstraintSnapshot, Entry, ScheduleOption, StudyHallAssignment, TimeSlot};

/// How a target relates to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Another teacher takes over the study hall at the same slot.
    StudyHallHandOff,
    /// Two open periods change hands.
    OpenExchange,
    /// The class moves within its teacher's week.
    ClassMove,
    /// Two teachers trade class times.
    ClassExchange,
}

/// A selected cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    /// Teacher grid.
    pub teacher: String,
    /// Slot in that grid.
    pub slot: TimeSlot,
}

impl CellRef {
    /// Creates a cell reference.
    pub fn new(teacher: impl Into<String>, slot: TimeSlot) -> Self {
        Self {
            teacher: teacher.into(),
            slot,
        }
    }
}

/// A legal destination for a selected cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwapTarget {
    /// Target cell.
    pub cell: CellRef,
    /// Relationship to the source.
    pub kind: TargetKind,
}

/// One cell relocation within a commit.
#[derive(Debug, Clone)]
struct CellMove {
    from: CellRef,
    to: CellRef,
}

/// Looks up the entry of a cell, validating teacher and slot.
pub(crate) fn entry_at<'a>(option: &'a ScheduleOption, cell: &CellRef) -> EditResult<&'a Entry> {
    let schedule = option
        .teacher(&cell.teacher)
        .ok_or_else(|| EditError::UnknownTeacher(cell.teacher.clone()))?;
    schedule
        .get(cell.slot)
        .ok_or(EditError::SlotOutOfRange(cell.slot))
}

/// Lists every legal target for the cell at `source`.
pub fn find_targets(
    option: &ScheduleOption,
    snapshot: &ConstraintSnapshot,
    source: &CellRef,
) -> EditResult<Vec<SwapTarget>> {
    let entry = entry_at(option, source)?;
    let targets = match entry {
        Entry::StudyHall { .. } => study_hall_targets(option, snapshot, source),
        Entry::Open { .. } => open_targets(option, source),
        Entry::Class { group, subject } => {
            let mut targets = class_move_targets(option, source, group, subject);
            targets.extend(class_exchange_targets(option, source, group, subject));
            targets
        }
    };
    debug!(
        teacher = %source.teacher,
        slot = %source.slot,
        kind = ?entry.kind(),
        count = targets.len(),
        "swap targets found"
    );
    Ok(targets)
}

/// Lists targets for a group-view selection.
///
/// The source teacher is whoever teaches `group` at `slot`: the mirror's
/// occupant when present, otherwise the first teacher grid with a class or
/// study hall covering the group. Exchanges are limited to classes of the
/// same group.
pub fn find_targets_for_group(
    option: &ScheduleOption,
    snapshot: &ConstraintSnapshot,
    group: &str,
    slot: TimeSlot,
) -> EditResult<(CellRef, Vec<SwapTarget>)> {
    let source = group_source(option, group, slot).ok_or_else(|| EditError::EmptyGroupSlot {
        group: group.to_string(),
        slot,
    })?;
    let targets = find_targets(option, snapshot, &source)?
        .into_iter()
        .filter(|t| match t.kind {
            TargetKind::ClassExchange => option
                .entry(&t.cell.teacher, t.cell.slot)
                .is_some_and(|e| option.covered_groups(e.label()).contains(group)),
            _ => true,
        })
        .collect();
    Ok((source, targets))
}

fn group_source(option: &ScheduleOption, group: &str, slot: TimeSlot) -> Option<CellRef> {
    if let Some(cell) = option.grade_schedules.get(group).and_then(|g| g.get(slot)) {
        let teacher = cell.teacher();
        if option.entry(teacher, slot).is_some_and(|e| !e.is_open()) {
            return Some(CellRef::new(teacher, slot));
        }
    }
    option
        .teacher_schedules
        .iter()
        .find(|(_, schedule)| {
            schedule
                .get(slot)
                .is_some_and(|e| !e.is_open() && option.covered_groups(e.label()).contains(group))
        })
        .map(|(name, _)| CellRef::new(name.clone(), slot))
}

fn study_hall_targets(
    option: &ScheduleOption,
    snapshot: &ConstraintSnapshot,
    source: &CellRef,
) -> Vec<SwapTarget> {
    option
        .teacher_schedules
        .iter()
        .filter(|(name, _)| **name != source.teacher)
        .filter(|(name, _)| snapshot.is_study_hall_eligible(name))
        .filter(|(_, schedule)| schedule.get(source.slot).is_some_and(Entry::is_open))
        .map(|(name, _)| SwapTarget {
            cell: CellRef::new(name.clone(), source.slot),
            kind: TargetKind::StudyHallHandOff,
        })
        .collect()
}

fn open_targets(option: &ScheduleOption, source: &CellRef) -> Vec<SwapTarget> {
    option
        .teacher_schedules
        .iter()
        .filter(|(name, _)| **name != source.teacher)
        .flat_map(|(name, schedule)| {
            schedule
                .iter()
                .filter(|(_, e)| e.is_open())
                .map(|(slot, _)| SwapTarget {
                    cell: CellRef::new(name.clone(), slot),
                    kind: TargetKind::OpenExchange,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Whether some class other than those in `skip` teaches `subject` to any of
/// `groups` on the day of `slot`.
fn subject_taught_on_day(
    option: &ScheduleOption,
    groups: &BTreeSet<String>,
    subject: &str,
    slot: TimeSlot,
    skip: &[&CellRef],
) -> bool {
    option.teacher_schedules.iter().any(|(name, schedule)| {
        schedule.day(slot.day).any(|(s, e)| {
            e.subject() == Some(subject)
                && !skip.iter().any(|c| c.teacher == *name && c.slot == s)
                && !option.covered_groups(e.label()).is_disjoint(groups)
        })
    })
}

/// Whether a class of another teacher covers any of `groups` at `slot`.
fn group_busy(
    option: &ScheduleOption,
    groups: &BTreeSet<String>,
    slot: TimeSlot,
    except: &str,
) -> bool {
    option
        .teacher_schedules
        .iter()
        .filter(|(name, _)| name.as_str() != except)
        .any(|(_, schedule)| {
            schedule.get(slot).is_some_and(|e| {
                e.is_class() && !option.covered_groups(e.label()).is_disjoint(groups)
            })
        })
}

fn class_move_targets(
    option: &ScheduleOption,
    source: &CellRef,
    group: &str,
    subject: &str,
) -> Vec<SwapTarget> {
    let Some(schedule) = option.teacher(&source.teacher) else {
        return Vec::new();
    };
    let groups = option.covered_groups(group);
    schedule
        .iter()
        .filter(|(slot, e)| *slot != source.slot && e.is_open())
        .filter(|(slot, _)| !group_busy(option, &groups, *slot, &source.teacher))
        .filter(|(slot, _)| !subject_taught_on_day(option, &groups, subject, *slot, &[source]))
        .map(|(slot, _)| SwapTarget {
            cell: CellRef::new(source.teacher.clone(), slot),
            kind: TargetKind::ClassMove,
        })
        .collect()
}

fn class_exchange_targets(
    option: &ScheduleOption,
    source: &CellRef,
    group: &str,
    subject: &str,
) -> Vec<SwapTarget> {
    let Some(own) = option.teacher(&source.teacher) else {
        return Vec::new();
    };
    let groups = option.covered_groups(group);
    let mut targets = Vec::new();
    for (name, other) in &option.teacher_schedules {
        if *name == source.teacher || !other.get(source.slot).is_some_and(Entry::is_open) {
            continue;
        }
        for (slot, entry) in other.iter() {
            let Entry::Class {
                group: other_group,
                subject: other_subject,
            } = entry
            else {
                continue;
            };
            if !own.get(slot).is_some_and(Entry::is_open) {
                continue;
            }
            let target = CellRef::new(name.clone(), slot);
            let skip = [source, &target];
            let other_groups = option.covered_groups(other_group);
            if subject_taught_on_day(option, &groups, subject, slot, &skip)
                || subject_taught_on_day(option, &other_groups, other_subject, source.slot, &skip)
            {
                continue;
            }
            targets.push(SwapTarget {
                cell: target,
                kind: TargetKind::ClassExchange,
            });
        }
    }
    targets
}

fn moves_for(source: &CellRef, target: &SwapTarget) -> Vec<CellMove> {
    let mv = |from: &CellRef, to: &CellRef| CellMove {
        from: from.clone(),
        to: to.clone(),
    };
    let t = &target.cell;
    match target.kind {
        TargetKind::StudyHallHandOff | TargetKind::OpenExchange | TargetKind::ClassMove => {
            vec![mv(source, t), mv(t, source)]
        }
        TargetKind::ClassExchange => {
            let own_dest = CellRef::new(source.teacher.clone(), t.slot);
            let other_dest = CellRef::new(t.teacher.clone(), source.slot);
            vec![
                mv(source, &own_dest),
                mv(&own_dest, source),
                mv(t, &other_dest),
                mv(&other_dest, t),
            ]
        }
    }
}

/// Applies a set of cell relocations, patching the mirror and study-hall
/// records. All sources are read before any destination is written.
fn apply_moves(option: &mut ScheduleOption, moves: &[CellMove]) -> EditResult<()> {
    let mut lifted = Vec::with_capacity(moves.len());
    for m in moves {
        let entry = entry_at(option, &m.from)?.clone();
        lifted.push(entry);
    }

    for (m, entry) in moves.iter().zip(&lifted) {
        option.mirror_clear(&m.from.teacher, m.from.slot, entry.label());
    }

    for (m, entry) in moves.iter().zip(&lifted) {
        let schedule = option
            .teacher_schedules
            .get_mut(&m.to.teacher)
            .ok_or_else(|| EditError::UnknownTeacher(m.to.teacher.clone()))?;
        schedule
            .set(m.to.slot, entry.clone())
            .ok_or(EditError::SlotOutOfRange(m.to.slot))?;
    }

    for (m, entry) in moves.iter().zip(&lifted) {
        option.mirror_write(&m.to.teacher, m.to.slot, entry);
        if let Entry::StudyHall { group } = entry {
            if let Some(i) = option.study_hall_record(group, &m.from.teacher, m.from.slot) {
                option.study_hall_assignments[i] =
                    StudyHallAssignment::placed(group.clone(), m.to.teacher.clone(), m.to.slot);
            }
        }
    }
    Ok(())
}

/// Commits `source` → `target` on a copy of `option`.
///
/// The target must be one of [`find_targets`]' results for the source. The
/// input option is never modified; stats are left for the caller to refresh.
pub fn commit_swap(
    option: &ScheduleOption,
    snapshot: &ConstraintSnapshot,
    source: &CellRef,
    target: &SwapTarget,
) -> EditResult<ScheduleOption> {
    let legal = find_targets(option, snapshot, source)?;
    if !legal.contains(target) {
        return Err(EditError::IllegalTarget {
            teacher: target.cell.teacher.clone(),
            slot: target.cell.slot,
        });
    }

    let mut next = option.clone();
    let before = next.study_hall_count();
    apply_moves(&mut next, &moves_for(source, target))?;
    let after = next.study_hall_count();
    if before != after {
        return Err(EditError::StudyHallCountChanged { before, after });
    }

    info!(
        from_teacher = %source.teacher,
        from_slot = %source.slot,
        to_teacher = %target.cell.teacher,
        to_slot = %target.cell.slot,
        kind = ?target.kind,
        "swap committed"
    );
    Ok(next)
}
