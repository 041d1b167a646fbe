//! Scheduling rule configuration.
//!
//! Rules arrive as a list of `{ rule_key, enabled, config }` records. A rule
//! that is missing from the list counts as enabled with an empty config.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use super::roster::{Teacher, TeacherStatus};

/// No subject twice per day for the same grade.
pub const NO_DUPLICATE_SUBJECTS: &str = "no_duplicate_subjects";
/// Warn on back-to-back open periods of full-time teachers.
pub const NO_BTB_OPEN: &str = "no_btb_open";
/// Penalize several open periods on one day.
pub const SPREAD_OPEN: &str = "spread_open";
/// Study halls are distributed at all.
pub const STUDY_HALL_DISTRIBUTION: &str = "study_hall_distribution";
/// Grades that need study-hall coverage (`config.grades`).
pub const STUDY_HALL_GRADES: &str = "study_hall_grades";
/// Statuses allowed to supervise study halls.
pub const STUDY_HALL_TEACHER_ELIGIBILITY: &str = "study_hall_teacher_eligibility";

/// Default number of back-to-back occurrences that triggers a warning.
pub const DEFAULT_BACK_TO_BACK_THRESHOLD: u32 = 3;

static NULL: Value = Value::Null;

/// One configured rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier.
    pub rule_key: String,
    /// Whether the rule is active.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Rule-specific settings.
    #[serde(default)]
    pub config: Value,
}

fn enabled_default() -> bool {
    true
}

impl Rule {
    /// Creates an enabled rule with no config.
    pub fn enabled(rule_key: impl Into<String>) -> Self {
        Self {
            rule_key: rule_key.into(),
            enabled: true,
            config: Value::Null,
        }
    }

    /// Creates a disabled rule.
    pub fn disabled(rule_key: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::enabled(rule_key)
        }
    }

    /// Sets the config object.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }
}

/// The rule configuration of a school.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty rule set (every rule enabled by default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Configured rules.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    fn find(&self, rule_key: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.rule_key == rule_key)
    }

    /// Whether a rule is enabled. Unknown rules are enabled.
    pub fn is_enabled(&self, rule_key: &str) -> bool {
        self.find(rule_key).map_or(true, |r| r.enabled)
    }

    /// Config of a rule, or `Null`.
    pub fn config(&self, rule_key: &str) -> &Value {
        self.find(rule_key).map_or(&NULL, |r| &r.config)
    }

    /// Grades that must receive a study hall. Empty if disabled or unset.
    pub fn study_hall_grades(&self) -> Vec<String> {
        if !self.is_enabled(STUDY_HALL_GRADES) {
            return Vec::new();
        }
        self.config(STUDY_HALL_GRADES)
            .get("grades")
            .and_then(Value::as_array)
            .map(|grades| {
                grades
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Statuses allowed to supervise study halls. Defaults to full-time only.
    pub fn study_hall_statuses(&self) -> BTreeSet<TeacherStatus> {
        let mut statuses = BTreeSet::new();
        if !self.is_enabled(STUDY_HALL_TEACHER_ELIGIBILITY) {
            statuses.insert(TeacherStatus::FullTime);
            return statuses;
        }
        let config = self.config(STUDY_HALL_TEACHER_ELIGIBILITY);
        let flag = |key: &str, default: bool| {
            config.get(key).and_then(Value::as_bool).unwrap_or(default)
        };
        if flag("allow_full_time", true) {
            statuses.insert(TeacherStatus::FullTime);
        }
        if flag("allow_part_time", false) {
            statuses.insert(TeacherStatus::PartTime);
        }
        if statuses.is_empty() {
            statuses.insert(TeacherStatus::FullTime);
        }
        statuses
    }

    /// Whether `teacher` may supervise study halls.
    pub fn is_study_hall_eligible(&self, teacher: &Teacher) -> bool {
        !teacher.study_hall_excluded && self.study_hall_statuses().contains(&teacher.status)
    }

    /// Back-to-back occurrences per week that trigger a warning.
    pub fn back_to_back_threshold(&self) -> u32 {
        self.config(NO_BTB_OPEN)
            .get("threshold")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_BACK_TO_BACK_THRESHOLD, |t| t as u32)
    }
}
