//! Edit session: the state machine around one stored option.
//!
//! A session owns the persisted option and at most one active edit mode.
//! Every mode edits its own working copy; the persisted option changes only
//! through [`EditSession::commit`] and [`EditSession::undo`], both of which
//! write the whole document back through the store.
//!
//! # Modes
//!
//! | Mode | Entered by | Edits |
//! |------|-----------|-------|
//! | `Swap` | [`EditSession::begin_swap`] | select / swap |
//! | `StudyHallReassignment` | [`EditSession::begin_study_hall_reassignment`] | swap, study-hall sources only |
//! | `Freeform` | [`EditSession::begin_freeform`] | pick up / place / return / unplace |
//! | `Regeneration` | [`EditSession::regenerate`] | none, validate and commit only |
//!
//! Mutating calls return the [`EditEvent`]s they caused so callers can
//! present them without the session knowing how.

use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::collab::{ScheduleSolver, ScheduleStore, SolverRequest};
use crate::error::{EditError, EditResult};
use crate::freeform::{BlockId, FreeformState};
use crate::merge::merge_regenerated;
use crate::models::{ConstraintSnapshot, EntryKind, ScheduleOption, TimeSlot};
use crate::stats;
use crate::swap::{self, CellRef, SwapTarget};
use crate::validation::{preflight, ValidationError, ValidationReport, Validator};

/// Number of committed states kept for undo.
pub const UNDO_DEPTH: usize = 20;

/// Active edit mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Nothing is being edited.
    Idle,
    /// Swapping cells.
    Swap {
        /// Copy being edited.
        working: ScheduleOption,
        /// Source cell awaiting a target.
        selection: Option<CellRef>,
    },
    /// Handing study halls to other teachers.
    StudyHallReassignment {
        /// Copy being edited.
        working: ScheduleOption,
        /// Selected study hall awaiting a target.
        selection: Option<CellRef>,
    },
    /// Picking up and placing blocks.
    Freeform {
        /// Copy being edited.
        working: ScheduleOption,
        /// Floating and placed blocks.
        state: FreeformState,
    },
    /// Reviewing a merged regeneration.
    Regeneration {
        /// Merged option.
        working: ScheduleOption,
        /// Teachers whose grids were regenerated.
        teachers: Vec<String>,
        /// Locked-teacher findings from the merge.
        integrity: Vec<ValidationError>,
    },
}

impl Mode {
    /// Short name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Swap { .. } => "swap",
            Mode::StudyHallReassignment { .. } => "study_hall_reassignment",
            Mode::Freeform { .. } => "freeform",
            Mode::Regeneration { .. } => "regeneration",
        }
    }

    /// Whether no edit is active.
    pub fn is_idle(&self) -> bool {
        matches!(self, Mode::Idle)
    }

    /// Working copy of the active mode.
    pub fn working(&self) -> Option<&ScheduleOption> {
        match self {
            Mode::Idle => None,
            Mode::Swap { working, .. }
            | Mode::StudyHallReassignment { working, .. }
            | Mode::Freeform { working, .. }
            | Mode::Regeneration { working, .. } => Some(working),
        }
    }
}

/// Something a transition did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditEvent {
    /// An edit mode became active.
    ModeEntered { mode: &'static str },
    /// The session returned to idle after `mode`.
    ModeLeft { mode: &'static str },
    /// A source cell was selected and `targets` legal targets were found.
    SourceSelected { cell: CellRef, targets: usize },
    /// A swap was applied to the working copy.
    Swapped { source: CellRef, target: SwapTarget },
    /// A cell was lifted into a floating block.
    PickedUp { block: BlockId, cell: CellRef },
    /// A block was placed, possibly displacing the cell's content.
    Placed {
        block: BlockId,
        dest: CellRef,
        displaced: Option<BlockId>,
    },
    /// A block went back to its origin, evicting whatever stood there.
    Returned { block: BlockId, evicted: Vec<BlockId> },
    /// A placed block was lifted off the grid again.
    Unplaced { block: BlockId },
    /// The block selection changed.
    BlockSelected { block: Option<BlockId> },
    /// Solver output for `teachers` was merged into the working copy.
    Regenerated {
        teachers: Vec<String>,
        integrity_errors: usize,
    },
    /// The working copy was validated.
    Validated { blocking: usize, warnings: usize },
    /// The working copy replaced the stored option.
    Committed { undo_depth: usize },
    /// The working copy of `mode` was discarded.
    Cancelled { mode: &'static str },
    /// The previous committed state was restored.
    Undone { undo_depth: usize },
}

/// One user's editing of one stored option.
#[derive(Debug, Clone)]
pub struct EditSession {
    doc_id: String,
    option_index: usize,
    persisted: ScheduleOption,
    snapshot: ConstraintSnapshot,
    mode: Mode,
    pending_validation: Option<ValidationReport>,
    undo: VecDeque<ScheduleOption>,
}

impl EditSession {
    /// Creates a session over an already loaded option.
    pub fn new(
        doc_id: impl Into<String>,
        option_index: usize,
        persisted: ScheduleOption,
        snapshot: ConstraintSnapshot,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            option_index,
            persisted,
            snapshot,
            mode: Mode::Idle,
            pending_validation: None,
            undo: VecDeque::new(),
        }
    }

    /// Loads option `option_index` of document `doc_id`.
    pub async fn open(
        store: &dyn ScheduleStore,
        doc_id: &str,
        option_index: usize,
        snapshot: ConstraintSnapshot,
    ) -> EditResult<Self> {
        let doc = store.load(doc_id).await?;
        let persisted = doc.option(doc_id, option_index)?.clone();
        debug!(doc_id, option_index, "edit session opened");
        Ok(Self::new(doc_id, option_index, persisted, snapshot))
    }

    /// Current edit mode.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Last committed option.
    pub fn persisted(&self) -> &ScheduleOption {
        &self.persisted
    }

    /// Constraints the session validates against.
    pub fn snapshot(&self) -> &ConstraintSnapshot {
        &self.snapshot
    }

    /// Working copy of the active mode.
    pub fn working(&self) -> Option<&ScheduleOption> {
        self.mode.working()
    }

    /// Freeform state, in freeform mode.
    pub fn freeform(&self) -> Option<&FreeformState> {
        match &self.mode {
            Mode::Freeform { state, .. } => Some(state),
            _ => None,
        }
    }

    /// Last validation, unless the working copy changed since.
    pub fn pending_validation(&self) -> Option<&ValidationReport> {
        self.pending_validation.as_ref()
    }

    /// Number of committed states that can be undone.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    // ===== Mode entry =====

    fn ensure_idle(&self, requested: &'static str) -> EditResult<()> {
        if self.mode.is_idle() {
            Ok(())
        } else {
            Err(EditError::ModeConflict {
                active: self.mode.name(),
                requested,
            })
        }
    }

    fn enter(&mut self, mode: Mode) -> Vec<EditEvent> {
        let name = mode.name();
        self.mode = mode;
        self.pending_validation = None;
        info!(doc_id = %self.doc_id, mode = name, "edit mode entered");
        vec![EditEvent::ModeEntered { mode: name }]
    }

    /// Starts swapping on a copy of the persisted option.
    pub fn begin_swap(&mut self) -> EditResult<Vec<EditEvent>> {
        self.ensure_idle("swap")?;
        Ok(self.enter(Mode::Swap {
            working: self.persisted.clone(),
            selection: None,
        }))
    }

    /// Starts reassigning study halls.
    pub fn begin_study_hall_reassignment(&mut self) -> EditResult<Vec<EditEvent>> {
        self.ensure_idle("study_hall_reassignment")?;
        Ok(self.enter(Mode::StudyHallReassignment {
            working: self.persisted.clone(),
            selection: None,
        }))
    }

    /// Starts freeform editing.
    pub fn begin_freeform(&mut self) -> EditResult<Vec<EditEvent>> {
        self.ensure_idle("freeform")?;
        Ok(self.enter(Mode::Freeform {
            working: self.persisted.clone(),
            state: FreeformState::new(),
        }))
    }

    // ===== Swap =====

    /// Selects a source cell and lists its targets.
    ///
    /// In study-hall reassignment mode the source must be a study hall.
    pub fn select_source(
        &mut self,
        cell: CellRef,
    ) -> EditResult<(Vec<SwapTarget>, Vec<EditEvent>)> {
        let (working, selection, study_halls_only) = swap_mode(&mut self.mode)?;
        if study_halls_only {
            let found = swap::entry_at(working, &cell)?.kind();
            if found != EntryKind::StudyHall {
                return Err(EditError::WrongSourceKind {
                    expected: EntryKind::StudyHall,
                    found,
                });
            }
        }
        let targets = swap::find_targets(working, &self.snapshot, &cell)?;
        *selection = Some(cell.clone());
        let events = vec![EditEvent::SourceSelected {
            cell,
            targets: targets.len(),
        }];
        Ok((targets, events))
    }

    /// Selects the cell a group attends at `slot` and lists its targets.
    pub fn select_group_source(
        &mut self,
        group: &str,
        slot: TimeSlot,
    ) -> EditResult<(Vec<SwapTarget>, Vec<EditEvent>)> {
        let (working, selection, study_halls_only) = swap_mode(&mut self.mode)?;
        let (cell, targets) = swap::find_targets_for_group(working, &self.snapshot, group, slot)?;
        if study_halls_only {
            let found = swap::entry_at(working, &cell)?.kind();
            if found != EntryKind::StudyHall {
                return Err(EditError::WrongSourceKind {
                    expected: EntryKind::StudyHall,
                    found,
                });
            }
        }
        *selection = Some(cell.clone());
        let events = vec![EditEvent::SourceSelected {
            cell,
            targets: targets.len(),
        }];
        Ok((targets, events))
    }

    /// Swaps the selected source with `target`.
    pub fn swap_to(&mut self, target: &SwapTarget) -> EditResult<Vec<EditEvent>> {
        let (working, selection, _) = swap_mode(&mut self.mode)?;
        let source = selection.clone().ok_or(EditError::NoSelection)?;
        let mut next = swap::commit_swap(working, &self.snapshot, &source, target)?;
        stats::recompute(&mut next, &self.snapshot);
        *working = next;
        *selection = None;
        self.pending_validation = None;
        Ok(vec![EditEvent::Swapped {
            source,
            target: target.clone(),
        }])
    }

    // ===== Freeform =====

    /// Picks up the entry at `cell`.
    pub fn pick_up(&mut self, cell: CellRef) -> EditResult<Vec<EditEvent>> {
        let (working, state) = freeform_mode(&mut self.mode)?;
        let block = state.pick_up(working, &cell)?;
        stats::recompute(working, &self.snapshot);
        self.pending_validation = None;
        Ok(vec![EditEvent::PickedUp { block, cell }])
    }

    /// Places the selected block at `dest`.
    pub fn place(&mut self, dest: CellRef) -> EditResult<Vec<EditEvent>> {
        let (working, state) = freeform_mode(&mut self.mode)?;
        let block = state.selected().ok_or(EditError::NoSelection)?;
        let displaced = state.place(working, &dest)?;
        stats::recompute(working, &self.snapshot);
        self.pending_validation = None;
        Ok(vec![EditEvent::Placed {
            block,
            dest,
            displaced,
        }])
    }

    /// Returns a block to its source cell.
    pub fn return_block(&mut self, block: BlockId) -> EditResult<Vec<EditEvent>> {
        let (working, state) = freeform_mode(&mut self.mode)?;
        let evicted = state.return_block(working, block)?;
        stats::recompute(working, &self.snapshot);
        self.pending_validation = None;
        Ok(vec![EditEvent::Returned { block, evicted }])
    }

    /// Clears a block's placement.
    pub fn unplace(&mut self, block: BlockId) -> EditResult<Vec<EditEvent>> {
        let (working, state) = freeform_mode(&mut self.mode)?;
        state.unplace(working, block)?;
        stats::recompute(working, &self.snapshot);
        self.pending_validation = None;
        Ok(vec![EditEvent::Unplaced { block }])
    }

    /// Toggles selection of a floating block.
    pub fn select_block(&mut self, block: BlockId) -> EditResult<Vec<EditEvent>> {
        let (_, state) = freeform_mode(&mut self.mode)?;
        let selected = state.select(block)?;
        self.pending_validation = None;
        Ok(vec![EditEvent::BlockSelected { block: selected }])
    }

    // ===== Regeneration =====

    /// Asks the solver to rebuild `teachers` and merges the answer.
    ///
    /// Every other teacher is sent as locked. On any failure the session
    /// stays idle and nothing is applied.
    pub async fn regenerate(
        &mut self,
        solver: &dyn ScheduleSolver,
        teachers: &[String],
    ) -> EditResult<Vec<EditEvent>> {
        self.ensure_idle("regeneration")?;

        let diagnostics = preflight(&self.snapshot);
        if !diagnostics.is_empty() {
            return Err(EditError::Preflight(Box::new(diagnostics)));
        }

        let request = SolverRequest::from_snapshot(&self.snapshot)
            .with_locked_from(&self.persisted, teachers);
        info!(
            doc_id = %self.doc_id,
            teachers = teachers.len(),
            locked = request.locked_teachers.len(),
            "requesting regeneration"
        );
        let regenerated = solver.solve(&request).await.into_best()?;

        let outcome = merge_regenerated(&self.persisted, &regenerated, teachers);
        let mut working = outcome.option;
        stats::recompute(&mut working, &self.snapshot);
        let integrity_errors = outcome.integrity.len();
        if integrity_errors > 0 {
            warn!(integrity_errors, "solver changed locked teachers");
        }

        let mut events = self.enter(Mode::Regeneration {
            working,
            teachers: teachers.to_vec(),
            integrity: outcome.integrity,
        });
        events.push(EditEvent::Regenerated {
            teachers: teachers.to_vec(),
            integrity_errors,
        });
        Ok(events)
    }

    // ===== Validate / commit =====

    /// Validates the working copy and keeps the report for commit.
    pub fn validate(&mut self) -> EditResult<(&ValidationReport, Vec<EditEvent>)> {
        let validator = Validator::new(&self.snapshot);
        let report = match &self.mode {
            Mode::Idle => {
                return Err(EditError::WrongMode {
                    expected: "editing",
                    actual: "idle",
                })
            }
            Mode::Swap { working, .. } | Mode::StudyHallReassignment { working, .. } => {
                validator.run(working)
            }
            Mode::Freeform { working, state } => validator.with_freeform(state).run(working),
            Mode::Regeneration {
                working, integrity, ..
            } => validator.with_integrity(integrity.clone()).run(working),
        };
        let events = vec![EditEvent::Validated {
            blocking: report.blocking_count(),
            warnings: report.warnings().count(),
        }];
        let report: &ValidationReport = self.pending_validation.insert(report);
        Ok((report, events))
    }

    /// Persists the working copy and returns to idle.
    ///
    /// Requires a validation of the current working copy without blocking
    /// findings. The previous persisted option is kept for undo.
    pub async fn commit(&mut self, store: &dyn ScheduleStore) -> EditResult<Vec<EditEvent>> {
        let mut working = self
            .mode
            .working()
            .cloned()
            .ok_or(EditError::WrongMode {
                expected: "editing",
                actual: "idle",
            })?;
        let report = self
            .pending_validation
            .as_ref()
            .ok_or(EditError::ValidationStale)?;
        if !report.can_commit() {
            return Err(EditError::ValidationFailed {
                hard: report.blocking_count(),
            });
        }

        if let Mode::Freeform { state, .. } = &self.mode {
            state.sync_study_halls(&mut working);
        }
        stats::recompute(&mut working, &self.snapshot);
        self.write(store, &working).await?;

        let previous = std::mem::replace(&mut self.persisted, working);
        self.undo.push_back(previous);
        if self.undo.len() > UNDO_DEPTH {
            self.undo.pop_front();
        }
        let left = self.mode.name();
        self.mode = Mode::Idle;
        self.pending_validation = None;
        info!(
            doc_id = %self.doc_id,
            mode = left,
            undo_depth = self.undo.len(),
            "working copy committed"
        );
        Ok(vec![
            EditEvent::Committed {
                undo_depth: self.undo.len(),
            },
            EditEvent::ModeLeft { mode: left },
        ])
    }

    /// Discards the working copy.
    pub fn cancel(&mut self) -> EditResult<Vec<EditEvent>> {
        if self.mode.is_idle() {
            return Err(EditError::WrongMode {
                expected: "editing",
                actual: "idle",
            });
        }
        let left = self.mode.name();
        self.mode = Mode::Idle;
        self.pending_validation = None;
        info!(doc_id = %self.doc_id, mode = left, "edit cancelled");
        Ok(vec![
            EditEvent::Cancelled { mode: left },
            EditEvent::ModeLeft { mode: left },
        ])
    }

    /// Restores and persists the option as it was before the last commit.
    pub async fn undo(&mut self, store: &dyn ScheduleStore) -> EditResult<Vec<EditEvent>> {
        if !self.mode.is_idle() {
            return Err(EditError::WrongMode {
                expected: "idle",
                actual: self.mode.name(),
            });
        }
        let restored = self.undo.back().cloned().ok_or(EditError::NothingToUndo)?;
        self.write(store, &restored).await?;
        self.undo.pop_back();
        self.persisted = restored;
        info!(doc_id = %self.doc_id, undo_depth = self.undo.len(), "commit undone");
        Ok(vec![EditEvent::Undone {
            undo_depth: self.undo.len(),
        }])
    }

    /// Replaces this session's option in the stored document.
    async fn write(&self, store: &dyn ScheduleStore, option: &ScheduleOption) -> EditResult<()> {
        let mut doc = store.load(&self.doc_id).await?;
        doc.replace_option(&self.doc_id, self.option_index, option.clone())?;
        store.save(&self.doc_id, &doc).await?;
        Ok(())
    }
}

/// Working copy, selection, and the study-hall restriction of a swap mode.
fn swap_mode(mode: &mut Mode) -> EditResult<(&mut ScheduleOption, &mut Option<CellRef>, bool)> {
    match mode {
        Mode::Swap { working, selection } => Ok((working, selection, false)),
        Mode::StudyHallReassignment { working, selection } => Ok((working, selection, true)),
        other => Err(EditError::WrongMode {
            expected: "swap",
            actual: other.name(),
        }),
    }
}

fn freeform_mode(mode: &mut Mode) -> EditResult<(&mut ScheduleOption, &mut FreeformState)> {
    match mode {
        Mode::Freeform { working, state } => Ok((working, state)),
        other => Err(EditError::WrongMode {
            expected: "freeform",
            actual: other.name(),
        }),
    }
}
