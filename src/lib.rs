//! Weekly school timetable editing core.
//!
//! Edits, merges, and validates timetables that already exist: a solver
//! service produces candidate options, and this crate handles everything
//! after that. It never builds a timetable from constraints on its own.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `TimeSlot`, `Entry`, `TeacherSchedule`,
//!   `GradeSchedule`, `ScheduleOption`, roster, rules, `ConstraintSnapshot`
//! - **`stats`**: Per-teacher load counts and back-to-back metrics
//! - **`swap`**: Legal swap targets and atomic swap commits
//! - **`freeform`**: Pick-up / place / return of floating blocks
//! - **`validation`**: The full rule check, plus pre-flight diagnostics
//! - **`merge`**: Folding a partial regeneration into a full option
//! - **`session`**: The edit-mode state machine with commit and undo
//! - **`collab`**: Solver and storage contracts
//!
//! # Data flow
//!
//! An edit mutates a working copy of a `ScheduleOption`; stats are
//! refreshed, the validator runs, and only a clean working copy replaces
//! the stored option. `TeacherSchedule` is authoritative; `GradeSchedule`
//! is a best-effort mirror holding one occupant per group slot.

pub mod collab;
pub mod error;
pub mod freeform;
pub mod logging;
pub mod merge;
pub mod models;
pub mod session;
pub mod stats;
pub mod swap;
pub mod validation;

pub use error::{EditError, EditResult, StorageError};
pub use session::{EditEvent, EditSession, Mode};
