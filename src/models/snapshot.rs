//! Constraint snapshot: the inputs a timetable was generated from.

use serde::{Deserialize, Serialize};

use super::roster::{ClassDefinition, Teacher};
use super::rules::RuleSet;

/// Roster, class definitions, rules and grade list of a school.
///
/// Validation reads it to know what the timetable is supposed to contain,
/// and regeneration sends it to the solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSnapshot {
    /// Teacher roster.
    pub teachers: Vec<Teacher>,
    /// Classes to schedule.
    pub classes: Vec<ClassDefinition>,
    /// Rule configuration.
    #[serde(default)]
    pub rules: RuleSet,
    /// Configured grade names, in display order.
    #[serde(default)]
    pub grades: Vec<String>,
}

impl ConstraintSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a teacher.
    pub fn with_teacher(mut self, teacher: Teacher) -> Self {
        self.teachers.push(teacher);
        self
    }

    /// Adds a class.
    pub fn with_class(mut self, class: ClassDefinition) -> Self {
        self.classes.push(class);
        self
    }

    /// Sets the rules.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the grade list.
    pub fn with_grades(mut self, grades: Vec<String>) -> Self {
        self.grades = grades;
        self
    }

    /// Roster entry by name.
    pub fn teacher(&self, name: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.name == name)
    }

    /// Whether `name` is on the roster and full-time.
    pub fn is_full_time(&self, name: &str) -> bool {
        self.teacher(name).is_some_and(Teacher::is_full_time)
    }

    /// Whether `name` may supervise study halls under the current rules.
    ///
    /// Teachers missing from the roster are not eligible.
    pub fn is_study_hall_eligible(&self, name: &str) -> bool {
        self.teacher(name)
            .is_some_and(|t| self.rules.is_study_hall_eligible(t))
    }

    /// Classes taught by `teacher`.
    pub fn classes_for<'a>(
        &'a self,
        teacher: &'a str,
    ) -> impl Iterator<Item = &'a ClassDefinition> {
        self.classes.iter().filter(move |c| c.teacher == teacher)
    }

    /// Grid label of a class under the configured grade order.
    pub fn class_label(&self, class: &ClassDefinition) -> String {
        class.label_in(&self.grades)
    }

    /// Class definition matching a grid entry of `teacher`.
    pub fn find_class(
        &self,
        teacher: &str,
        label: &str,
        subject: &str,
    ) -> Option<&ClassDefinition> {
        self.classes.iter().find(|c| {
            c.teacher == teacher && c.subject == subject && self.class_label(c) == label
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rules::{Rule, STUDY_HALL_TEACHER_ELIGIBILITY};
    use serde_json::json;

    fn sample_snapshot() -> ConstraintSnapshot {
        ConstraintSnapshot::new()
            .with_teacher(Teacher::full_time("Ana"))
            .with_teacher(Teacher::part_time("Bo"))
            .with_class(ClassDefinition::new("Ana", "5th", "Math", 3))
            .with_class(ClassDefinition::new("Bo", "5th", "Art", 1))
            .with_grades(vec!["5th".into(), "6th".into()])
    }

    #[test]
    fn test_lookups() {
        let s = sample_snapshot();
        assert!(s.is_full_time("Ana"));
        assert!(!s.is_full_time("Bo"));
        assert!(!s.is_full_time("Nobody"));
        assert_eq!(s.classes_for("Ana").count(), 1);
        assert!(s.find_class("Ana", "5th", "Math").is_some());
        assert!(s.find_class("Ana", "6th", "Math").is_none());
    }

    #[test]
    fn test_find_class_outlives_label() {
        let s = sample_snapshot()
            .with_grades(vec!["6th Grade".into(), "7th Grade".into(), "8th Grade".into()])
            .with_class(
                ClassDefinition::new("Bo", "8th Grade", "Band", 2)
                    .with_grades(vec!["8th Grade".into(), "6th Grade".into()]),
            );
        let found = {
            let label = String::from("6th-8th Grade");
            s.find_class("Bo", &label, "Band")
        };
        assert_eq!(found.map(ClassDefinition::weekly_sessions), Some(2));
        assert_eq!(s.class_label(&s.classes[2]), "6th-8th Grade");
    }

    #[test]
    fn test_eligibility_follows_rules() {
        let s = sample_snapshot();
        assert!(s.is_study_hall_eligible("Ana"));
        assert!(!s.is_study_hall_eligible("Bo"));

        let part_time_ok = Rule::enabled(STUDY_HALL_TEACHER_ELIGIBILITY)
            .with_config(json!({ "allow_part_time": true }));
        let s = s.with_rules(RuleSet::new().with_rule(part_time_ok));
        assert!(s.is_study_hall_eligible("Bo"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let s: ConstraintSnapshot = serde_json::from_value(json!({
            "teachers": [{ "name": "Ana", "status": "full-time" }],
            "classes": []
        }))
        .unwrap();
        assert_eq!(s.teachers.len(), 1);
        assert!(s.rules.rules().is_empty());
    }
}
