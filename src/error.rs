//! Operational error types.
//!
//! Rule findings are not errors: they are reported through
//! [`ValidationReport`](crate::validation::ValidationReport). The types here
//! cover edits that cannot be carried out at all and collaborator failures.

use thiserror::Error;

use crate::collab::{SolverDiagnostics, SolverStatus};
use crate::models::{EntryKind, TimeSlot};

/// Storage collaborator failure.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No document with this id.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The document has no option at this index.
    #[error("document {id} has {len} options, index {index} is out of range")]
    OptionIndex { id: String, index: usize, len: usize },

    /// Document (de)serialization failed.
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failure of an edit operation.
#[derive(Error, Debug)]
pub enum EditError {
    // ===== Addressing =====
    #[error("unknown teacher: {0}")]
    UnknownTeacher(String),

    #[error("slot out of range: {0}")]
    SlotOutOfRange(TimeSlot),

    #[error("unknown floating block: #{0}")]
    UnknownBlock(u32),

    // ===== Illegal edits =====
    #[error("{teacher} has nothing to move at {slot}")]
    OpenSlot { teacher: String, slot: TimeSlot },

    #[error("{group} has nothing scheduled at {slot}")]
    EmptyGroupSlot { group: String, slot: TimeSlot },

    #[error("{teacher} at {slot} was already picked up")]
    AlreadyPickedUp { teacher: String, slot: TimeSlot },

    #[error("{teacher} at {slot} holds a pending placement; unplace it first")]
    PlacedCell { teacher: String, slot: TimeSlot },

    #[error("no block selected")]
    NoSelection,

    #[error("block #{0} is placed; unplace it before selecting")]
    BlockPlaced(u32),

    #[error("expected a {expected:?} entry, found {found:?}")]
    WrongSourceKind { expected: EntryKind, found: EntryKind },

    #[error("{teacher} at {slot} is not a legal target for the current selection")]
    IllegalTarget { teacher: String, slot: TimeSlot },

    #[error("study hall count changed from {before} to {after}")]
    StudyHallCountChanged { before: usize, after: usize },

    // ===== Session state =====
    #[error("cannot enter {requested} mode while {active} mode is active")]
    ModeConflict {
        active: &'static str,
        requested: &'static str,
    },

    #[error("operation requires {expected} mode, session is in {actual} mode")]
    WrongMode {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("working copy changed since the last validation")]
    ValidationStale,

    #[error("validation found {hard} blocking issue(s)")]
    ValidationFailed { hard: usize },

    #[error("nothing to undo")]
    NothingToUndo,

    // ===== Collaborators =====
    #[error("solver returned {status:?}: {message}")]
    Solver {
        status: SolverStatus,
        message: String,
        diagnostics: Option<Box<SolverDiagnostics>>,
    },

    #[error("request rejected before solving: {}", .0.summary())]
    Preflight(Box<SolverDiagnostics>),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result alias for edit operations.
pub type EditResult<T> = Result<T, EditError>;
