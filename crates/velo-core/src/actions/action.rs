//! Assistant action definitions.
//!
//! [`Action`] is the validated form: every variant carries exactly one
//! payload, so there is no way to hold an action of unknown type or with a
//! missing payload once validation has passed. It serializes back to the same
//! wire shape the model produces (`{"type": "create_goal", "goal": {...}}`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::goal::GoalType;
use crate::task::parse_deadline;

/// Goal proposed by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub goal_type: GoalType,
    #[serde(
        default,
        deserialize_with = "deserialize_deadline",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<DateTime<Utc>>,
}

/// Accepts an RFC 3339 timestamp, a bare `YYYY-MM-DD` date, or null.
fn deserialize_deadline<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("null") => Ok(None),
        Some(s) => parse_deadline(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid deadline '{s}'"))),
    }
}

/// Task proposed by the assistant.
///
/// `goal_index` points into the goals created earlier in the same batch;
/// `existing_goal_id` names a goal the user already has.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_goal_id: Option<String>,
    pub user_priority: i64,
}

/// Priority change proposed by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReprioritizePayload {
    pub task_id: String,
    pub new_priority: i64,
    #[serde(default)]
    pub reason: String,
}

/// A validated assistant action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    CreateGoal { goal: GoalPayload },
    CreateTask { task: TaskPayload },
    ReprioritizeTask { reprioritize: ReprioritizePayload },
}

impl Action {
    /// Wire name of this action's type tag
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::CreateGoal { .. } => "create_goal",
            Action::CreateTask { .. } => "create_task",
            Action::ReprioritizeTask { .. } => "reprioritize_task",
        }
    }

    /// Get a human-readable description of this action
    pub fn description(&self) -> String {
        match self {
            Action::CreateGoal { goal } => {
                format!("Create {} goal '{}'", goal.goal_type, goal.title)
            }
            Action::CreateTask { task } => {
                format!("Create task '{}' (priority {})", task.title, task.user_priority)
            }
            Action::ReprioritizeTask { reprioritize } => format!(
                "Set priority of task {} to {}: {}",
                reprioritize.task_id, reprioritize.new_priority, reprioritize.reason
            ),
        }
    }
}

/// One validated model reply: the conversational message plus its actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionBatch {
    pub message: String,
    pub actions: Vec<Action>,
}

impl ActionBatch {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Action as decoded from the wire, before validation.
#[derive(Debug, Deserialize)]
pub(crate) struct RawAction {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub goal: Option<GoalPayload>,
    pub task: Option<TaskPayload>,
    pub reprioritize: Option<ReprioritizePayload>,
}

/// Model reply as decoded from the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct RawReply {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub actions: Vec<RawAction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_to_wire_shape() {
        let action = Action::ReprioritizeTask {
            reprioritize: ReprioritizePayload {
                task_id: "abc-123".into(),
                new_priority: 3,
                reason: "due soon".into(),
            },
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "reprioritize_task");
        assert_eq!(json["reprioritize"]["task_id"], "abc-123");
    }

    #[test]
    fn task_payload_omits_absent_references() {
        let action = Action::CreateTask {
            task: TaskPayload {
                title: "Read chapter 1".into(),
                goal_index: Some(0),
                existing_goal_id: None,
                user_priority: 2,
            },
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "create_task");
        assert_eq!(json["task"]["goal_index"], 0);
        assert!(json["task"].get("existing_goal_id").is_none());
    }

    #[test]
    fn description_mentions_title() {
        let action = Action::CreateGoal {
            goal: GoalPayload {
                title: "Learn Rust".into(),
                description: String::new(),
                goal_type: GoalType::Exploration,
                deadline: None,
            },
        };
        assert_eq!(action.type_name(), "create_goal");
        assert_eq!(action.description(), "Create exploration goal 'Learn Rust'");
    }

    #[test]
    fn goal_deadline_accepts_date_or_null() {
        let goal: GoalPayload = serde_json::from_str(
            r#"{"title": "Ship", "goal_type": "deadline", "deadline": "2026-05-01"}"#,
        )
        .unwrap();
        assert_eq!(goal.deadline.unwrap().to_rfc3339(), "2026-05-01T00:00:00+00:00");

        let goal: GoalPayload =
            serde_json::from_str(r#"{"title": "Run", "goal_type": "habit", "deadline": null}"#)
                .unwrap();
        assert!(goal.deadline.is_none());
    }
}
