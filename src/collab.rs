//! Collaborator contracts: the solver service and document storage.
//!
//! Both are external. This module defines the data exchanged with them and
//! the async traits an embedder implements, plus [`MemoryStore`], an
//! in-process store for tests and single-process embedders.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{EditError, StorageError};
use crate::models::{
    ClassDefinition, ConstraintSnapshot, RuleSet, ScheduleOption, Teacher, TeacherSchedule,
    TimeSlot,
};

// ===== Solver =====

/// Outcome class of a solver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// At least one candidate was produced.
    Success,
    /// The constraints cannot be satisfied.
    Infeasible,
    /// The solver failed.
    Error,
}

/// Weekly session count of a teacher or grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadIssue {
    /// Teacher or grade name.
    pub name: String,
    /// Requested weekly sessions.
    pub sessions: u32,
}

/// Two classes of one teacher pinned to the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedSlotConflict {
    /// Teacher.
    pub teacher: String,
    /// Contested slot.
    pub slot: TimeSlot,
    /// Subject pinned first.
    pub first: String,
    /// Subject pinned second.
    pub second: String,
}

/// A class definition missing a required field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteClass {
    /// 1-based position in the class list.
    pub index: usize,
    /// Teacher, possibly empty.
    pub teacher: String,
    /// Subject, possibly empty.
    pub subject: String,
    /// Missing fields ("no teacher", "no grade", "no subject").
    pub issues: Vec<String>,
}

/// Structured detail accompanying an infeasible answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverDiagnostics {
    /// Teachers with more sessions than slots.
    #[serde(default)]
    pub teacher_overload: Vec<LoadIssue>,
    /// Grades with more non-elective sessions than slots.
    #[serde(default)]
    pub grade_overload: Vec<LoadIssue>,
    /// Clashing fixed slots.
    #[serde(default)]
    pub fixed_slot_conflicts: Vec<FixedSlotConflict>,
    /// Classes missing teacher, grade or subject.
    #[serde(default)]
    pub incomplete_classes: Vec<IncompleteClass>,
    /// One human-readable line per finding.
    #[serde(default)]
    pub preflight_errors: Vec<String>,
}

impl SolverDiagnostics {
    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.preflight_errors.is_empty()
            && self.teacher_overload.is_empty()
            && self.grade_overload.is_empty()
            && self.fixed_slot_conflicts.is_empty()
            && self.incomplete_classes.is_empty()
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        format!(
            "found {} constraint issue(s) that make scheduling impossible",
            self.preflight_errors.len()
        )
    }
}

/// Input of a (re)generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverRequest {
    /// Teacher roster.
    pub teachers: Vec<Teacher>,
    /// Class definitions.
    pub classes: Vec<ClassDefinition>,
    /// Rule configuration.
    pub rules: RuleSet,
    /// Grade list.
    pub grades: Vec<String>,
    /// Grids the solver must reproduce unchanged.
    #[serde(default)]
    pub locked_teachers: BTreeMap<String, TeacherSchedule>,
    /// Teachers whose study halls may be reassigned.
    #[serde(default)]
    pub study_hall_teachers: Vec<String>,
    /// Whether study halls may move to other teachers.
    #[serde(default)]
    pub allow_study_hall_reassignment: bool,
}

impl SolverRequest {
    /// A full-generation request for a snapshot.
    pub fn from_snapshot(snapshot: &ConstraintSnapshot) -> Self {
        Self {
            teachers: snapshot.teachers.clone(),
            classes: snapshot.classes.clone(),
            rules: snapshot.rules.clone(),
            grades: snapshot.grades.clone(),
            ..Self::default()
        }
    }

    /// Locks every teacher of `option` outside `regenerate`.
    pub fn with_locked_from(mut self, option: &ScheduleOption, regenerate: &[String]) -> Self {
        self.locked_teachers = option
            .teacher_schedules
            .iter()
            .filter(|(name, _)| !regenerate.contains(*name))
            .map(|(name, grid)| (name.clone(), grid.clone()))
            .collect();
        self
    }

    /// Allows study halls of `teachers` to be reassigned.
    pub fn with_study_hall_reassignment(mut self, teachers: Vec<String>) -> Self {
        self.study_hall_teachers = teachers;
        self.allow_study_hall_reassignment = true;
        self
    }
}

/// Answer of the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverResponse {
    /// Outcome class.
    pub status: SolverStatus,
    /// Candidates, best first. Empty unless `Success`.
    #[serde(default)]
    pub options: Vec<ScheduleOption>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Detail for infeasible answers.
    #[serde(default)]
    pub diagnostics: Option<SolverDiagnostics>,
}

impl SolverResponse {
    /// A successful answer.
    pub fn success(options: Vec<ScheduleOption>) -> Self {
        Self {
            status: SolverStatus::Success,
            options,
            message: String::new(),
            diagnostics: None,
        }
    }

    /// An infeasible answer.
    pub fn infeasible(message: impl Into<String>, diagnostics: Option<SolverDiagnostics>) -> Self {
        Self {
            status: SolverStatus::Infeasible,
            options: Vec::new(),
            message: message.into(),
            diagnostics,
        }
    }

    /// A failed call.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SolverStatus::Error,
            options: Vec::new(),
            message: message.into(),
            diagnostics: None,
        }
    }

    /// The best candidate, or the failure as an [`EditError::Solver`].
    pub fn into_best(self) -> Result<ScheduleOption, EditError> {
        let fail = |status: SolverStatus, message: String, diagnostics: Option<SolverDiagnostics>| {
            EditError::Solver {
                status,
                message,
                diagnostics: diagnostics.map(Box::new),
            }
        };
        match self.status {
            SolverStatus::Success => self.options.into_iter().next().ok_or_else(|| {
                fail(
                    SolverStatus::Error,
                    "solver reported success without options".to_string(),
                    None,
                )
            }),
            status => Err(fail(status, self.message, self.diagnostics)),
        }
    }
}

/// The constraint-solving service.
#[async_trait]
pub trait ScheduleSolver: Send + Sync {
    /// Produces candidate options for a request.
    ///
    /// Transport failures are reported as a `SolverStatus::Error` response.
    async fn solve(&self, request: &SolverRequest) -> SolverResponse;
}

// ===== Storage =====

/// A stored timetable document: a list of options plus metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDocument {
    /// Candidate options.
    pub options: Vec<ScheduleOption>,
    /// Index of the option shown by default.
    #[serde(default)]
    pub selected_index: usize,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// Star flag.
    #[serde(default)]
    pub starred: bool,
}

impl ScheduleDocument {
    /// A document holding `options`.
    pub fn new(options: Vec<ScheduleOption>) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Option at `index`.
    pub fn option(&self, id: &str, index: usize) -> Result<&ScheduleOption, StorageError> {
        self.options.get(index).ok_or_else(|| StorageError::OptionIndex {
            id: id.to_string(),
            index,
            len: self.options.len(),
        })
    }

    /// Replaces the option at `index`.
    pub fn replace_option(
        &mut self,
        id: &str,
        index: usize,
        option: ScheduleOption,
    ) -> Result<ScheduleOption, StorageError> {
        let len = self.options.len();
        let slot = self.options.get_mut(index).ok_or_else(|| StorageError::OptionIndex {
            id: id.to_string(),
            index,
            len,
        })?;
        Ok(std::mem::replace(slot, option))
    }
}

/// Document storage. Writes replace the whole document.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Reads a document.
    async fn load(&self, id: &str) -> Result<ScheduleDocument, StorageError>;

    /// Replaces a document.
    async fn save(&self, id: &str, document: &ScheduleDocument) -> Result<(), StorageError>;
}

/// In-process store keeping each document as serialized JSON.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document.
    pub fn with_document(
        self,
        id: &str,
        document: &ScheduleDocument,
    ) -> Result<Self, StorageError> {
        let json = serde_json::to_string(document)?;
        self.lock()?.insert(id.to_string(), json);
        Ok(self)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.docs
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<ScheduleDocument, StorageError> {
        let docs = self.lock()?;
        let json = docs
            .get(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(json)?)
    }

    async fn save(&self, id: &str, document: &ScheduleDocument) -> Result<(), StorageError> {
        let json = serde_json::to_string(document)?;
        debug!(id, bytes = json.len(), options = document.options.len(), "document saved");
        self.lock()?.insert(id.to_string(), json);
        Ok(())
    }
}
