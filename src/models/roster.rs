//! Teacher roster and class definitions.
//!
//! These are the inputs a timetable was built from. The editing core reads
//! them to decide study-hall eligibility and to check session counts,
//! fixed slots, and availability.

use serde::{Deserialize, Serialize};

use super::grade::grade_display;
use super::slot::{Day, TimeSlot};

/// Employment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TeacherStatus {
    /// Full-time staff. Subject to back-to-back open-period limits.
    FullTime,
    /// Part-time staff.
    PartTime,
}

/// A teacher on the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Unique teacher name (grid key).
    pub name: String,
    /// Employment status.
    pub status: TeacherStatus,
    /// Individually excluded from study-hall supervision.
    #[serde(default)]
    pub study_hall_excluded: bool,
}

impl Teacher {
    /// Creates a full-time teacher.
    pub fn full_time(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TeacherStatus::FullTime,
            study_hall_excluded: false,
        }
    }

    /// Creates a part-time teacher.
    pub fn part_time(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TeacherStatus::PartTime,
            study_hall_excluded: false,
        }
    }

    /// Excludes the teacher from study-hall supervision.
    pub fn excluded_from_study_hall(mut self) -> Self {
        self.study_hall_excluded = true;
        self
    }

    /// Whether the teacher is full-time.
    pub fn is_full_time(&self) -> bool {
        self.status == TeacherStatus::FullTime
    }
}

/// A class to be taught weekly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDefinition {
    /// Teaching teacher.
    pub teacher: String,
    /// Grades attending.
    pub grades: Vec<String>,
    /// Label written into the teacher grid. Derived from `grades` if empty.
    #[serde(default)]
    pub grade_display: String,
    /// Subject name.
    pub subject: String,
    /// Weekly frequency when not pinned to fixed slots.
    pub days_per_week: u32,
    /// Electives may share a slot with other electives of the same grades.
    #[serde(default)]
    pub is_elective: bool,
    /// Allowed days. `None` = every day.
    #[serde(default)]
    pub available_days: Option<Vec<Day>>,
    /// Allowed periods. `None` = every period.
    #[serde(default)]
    pub available_periods: Option<Vec<u8>>,
    /// Pinned slots. When non-empty, the class meets exactly here.
    #[serde(default)]
    pub fixed_slots: Vec<TimeSlot>,
}

impl ClassDefinition {
    /// Creates a class meeting `days_per_week` times for one grade.
    pub fn new(
        teacher: impl Into<String>,
        grade: impl Into<String>,
        subject: impl Into<String>,
        days_per_week: u32,
    ) -> Self {
        Self {
            teacher: teacher.into(),
            grades: vec![grade.into()],
            grade_display: String::new(),
            subject: subject.into(),
            days_per_week,
            is_elective: false,
            available_days: None,
            available_periods: None,
            fixed_slots: Vec::new(),
        }
    }

    /// Sets the attending grades.
    pub fn with_grades(mut self, grades: Vec<String>) -> Self {
        self.grades = grades;
        self
    }

    /// Sets the display label.
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.grade_display = display.into();
        self
    }

    /// Marks the class as an elective.
    pub fn elective(mut self) -> Self {
        self.is_elective = true;
        self
    }

    /// Restricts the class to some days.
    pub fn with_available_days(mut self, days: Vec<Day>) -> Self {
        self.available_days = Some(days);
        self
    }

    /// Restricts the class to some periods.
    pub fn with_available_periods(mut self, periods: Vec<u8>) -> Self {
        self.available_periods = Some(periods);
        self
    }

    /// Pins the class to fixed slots.
    pub fn with_fixed_slots(mut self, slots: Vec<TimeSlot>) -> Self {
        self.fixed_slots = slots;
        self
    }

    /// Label used in the teacher grid.
    ///
    /// An explicit display label wins; otherwise the grades are shown as a
    /// range ordered by the configured grade list `order`.
    pub fn label_in(&self, order: &[String]) -> String {
        if self.grade_display.is_empty() {
            grade_display(&self.grades, order)
        } else {
            self.grade_display.clone()
        }
    }

    /// Expected weekly occurrences.
    pub fn weekly_sessions(&self) -> u32 {
        if self.fixed_slots.is_empty() {
            self.days_per_week
        } else {
            self.fixed_slots.len() as u32
        }
    }

    /// Whether the class has fixed slots.
    pub fn is_fixed(&self) -> bool {
        !self.fixed_slots.is_empty()
    }

    /// Whether `slot` lies within the configured day/period availability.
    ///
    /// An empty list behaves like `None`.
    pub fn allows(&self, slot: TimeSlot) -> bool {
        let day_ok = match &self.available_days {
            Some(days) if !days.is_empty() => days.contains(&slot.day),
            _ => true,
        };
        let period_ok = match &self.available_periods {
            Some(periods) if !periods.is_empty() => periods.contains(&slot.period),
            _ => true,
        };
        day_ok && period_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teacher_builders() {
        let t = Teacher::full_time("Ana").excluded_from_study_hall();
        assert!(t.is_full_time());
        assert!(t.study_hall_excluded);
        assert!(!Teacher::part_time("Bo").is_full_time());
    }

    #[test]
    fn test_class_label_and_sessions() {
        let c = ClassDefinition::new("Ana", "5th", "Math", 3);
        assert_eq!(c.label_in(&[]), "5th");
        assert_eq!(c.weekly_sessions(), 3);

        let pinned = c.clone().with_fixed_slots(vec![
            TimeSlot::new(Day::Mon, 1),
            TimeSlot::new(Day::Wed, 1),
        ]);
        assert!(pinned.is_fixed());
        assert_eq!(pinned.weekly_sessions(), 2);

        let multi = ClassDefinition::new("Ana", "6th Grade", "Art", 1)
            .with_grades(vec!["6th Grade".into(), "7th Grade".into()]);
        assert_eq!(multi.label_in(&[]), "6th-7th Grade");
        assert_eq!(multi.with_display("Upper").label_in(&[]), "Upper");
    }

    #[test]
    fn test_label_follows_configured_grade_order() {
        let order: Vec<String> = vec!["6th Grade".into(), "7th Grade".into(), "8th Grade".into()];
        let c = ClassDefinition::new("T", "8th Grade", "Art", 1)
            .with_grades(vec!["8th Grade".into(), "6th Grade".into()]);
        assert_eq!(c.label_in(&order), "6th-8th Grade");
        // Without a configured order, grade numbers decide.
        assert_eq!(c.label_in(&[]), "6th-8th Grade");
    }

    #[test]
    fn test_availability() {
        let c = ClassDefinition::new("Ana", "5th", "Math", 3)
            .with_available_days(vec![Day::Mon, Day::Tues])
            .with_available_periods(vec![1, 2]);
        assert!(c.allows(TimeSlot::new(Day::Mon, 2)));
        assert!(!c.allows(TimeSlot::new(Day::Wed, 1)));
        assert!(!c.allows(TimeSlot::new(Day::Tues, 3)));

        let open = ClassDefinition::new("Ana", "5th", "Math", 3).with_available_days(vec![]);
        assert!(open.allows(TimeSlot::new(Day::Fri, 5)));
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&TeacherStatus::FullTime).unwrap();
        assert_eq!(json, "\"full-time\"");
    }
}
