//! Timetable domain models.
//!
//! Plain data types for a school week: slots, grid entries, the per-teacher
//! and per-group grids, the schedule option that aggregates them, and the
//! roster/class/rule inputs a timetable is checked against.
//!
//! # Views
//!
//! | Type | Keyed by | Role |
//! |------|----------|------|
//! | `TeacherSchedule` | teacher name | authoritative grid |
//! | `GradeSchedule` | group label | lossy single-occupant mirror |
//! | `StudyHallAssignment` | group | coverage record |
//! | `ScheduleOption` | - | aggregate root, persisted as a whole |

mod entry;
mod grade;
mod grid;
mod option;
mod roster;
mod rules;
mod slot;
mod snapshot;

pub use entry::{Entry, EntryKind, STUDY_HALL};
pub use grade::{grade_display, grade_number, resolve_groups};
pub use grid::{GradeCell, GradeSchedule, TeacherSchedule};
pub use option::{ScheduleOption, StudyHallAssignment, TeacherStats};
pub use roster::{ClassDefinition, Teacher, TeacherStatus};
pub use rules::{
    Rule, RuleSet, DEFAULT_BACK_TO_BACK_THRESHOLD, NO_BTB_OPEN, NO_DUPLICATE_SUBJECTS, SPREAD_OPEN,
    STUDY_HALL_DISTRIBUTION, STUDY_HALL_GRADES, STUDY_HALL_TEACHER_ELIGIBILITY,
};
pub use slot::{Day, TimeSlot, DAYS_PER_WEEK, PERIODS_PER_DAY, SLOT_COUNT};
pub use snapshot::ConstraintSnapshot;
