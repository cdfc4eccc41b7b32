//! Task types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

pub const PRIORITY_LOW: i64 = 1;
pub const PRIORITY_MEDIUM: i64 = 2;
pub const PRIORITY_HIGH: i64 = 3;

/// Whether `priority` is one of the three user-facing levels.
pub fn is_valid_priority(priority: i64) -> bool {
    (PRIORITY_LOW..=PRIORITY_HIGH).contains(&priority)
}

/// Human label for a priority level.
pub fn priority_label(priority: i64) -> &'static str {
    match priority {
        PRIORITY_LOW => "Low",
        PRIORITY_MEDIUM => "Medium",
        PRIORITY_HIGH => "High",
        _ => "Unknown",
    }
}

/// Parses a deadline given as RFC 3339 or as a bare `YYYY-MM-DD` date
/// (midnight UTC).
pub fn parse_deadline(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A unit of work under a goal.
///
/// Urgency is deliberately absent: it is derived from these fields on demand
/// by [`crate::urgency`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    /// 1 (low) to 3 (high)
    pub user_priority: i64,
    #[serde(default)]
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(user_id: Uuid, goal_id: Uuid, title: impl Into<String>, user_priority: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            goal_id,
            title: title.into(),
            description: String::new(),
            deadline: None,
            estimated_hours: None,
            user_priority,
            is_completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Option<DateTime<Utc>>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Checks a task entered by hand. Unlike assistant-created tasks, an
    /// out-of-range priority is an error here.
    pub fn validate_manual(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::invalid("title", "title is required"));
        }
        if !is_valid_priority(self.user_priority) {
            return Err(CoreError::invalid(
                "user_priority",
                "user priority must be between low (1) and high (3)",
            ));
        }
        if let Some(hours) = self.estimated_hours {
            if hours.is_nan() || hours < 0.0 {
                return Err(CoreError::invalid(
                    "estimated_hours",
                    "estimate must be a non-negative number",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_labels() {
        assert_eq!(priority_label(1), "Low");
        assert_eq!(priority_label(3), "High");
        assert_eq!(priority_label(9), "Unknown");
    }

    #[test]
    fn parse_deadline_formats() {
        let dt = parse_deadline("2026-04-01T09:30:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-04-01T07:30:00+00:00");
        let day = parse_deadline("2026-04-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2026-04-01T00:00:00+00:00");
        assert!(parse_deadline("next tuesday").is_none());
    }

    #[test]
    fn manual_task_rejects_out_of_range_priority() {
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "Draft outline", 4);
        assert!(task.validate_manual().is_err());
    }

    #[test]
    fn manual_task_rejects_blank_title() {
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "  ", 2);
        assert!(task.validate_manual().is_err());
    }

    #[test]
    fn manual_task_accepts_valid_input() {
        let mut task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "Draft outline", 2);
        task.estimated_hours = Some(1.5);
        assert!(task.validate_manual().is_ok());
    }
}
