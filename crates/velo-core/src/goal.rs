//! Goal types.
//!
//! A goal owns a set of tasks. Goals are never hard-deleted: retiring one moves
//! it to [`GoalStatus::Abandoned`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

/// What kind of commitment a goal represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Must be finished by a date
    Deadline,
    /// Recurring practice, tracked by frequency
    Habit,
    /// Open-ended learning or investigation
    Exploration,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Deadline => "deadline",
            GoalType::Habit => "habit",
            GoalType::Exploration => "exploration",
        }
    }
}

impl FromStr for GoalType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deadline" => Ok(GoalType::Deadline),
            "habit" => Ok(GoalType::Habit),
            "exploration" => Ok(GoalType::Exploration),
            other => Err(CoreError::invalid(
                "goal_type",
                format!("'{other}' is not one of deadline, habit, exploration"),
            )),
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Lifecycle of a goal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    /// Soft-deleted
    Abandoned,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::NotStarted => "not_started",
            GoalStatus::InProgress => "in_progress",
            GoalStatus::Completed => "completed",
            GoalStatus::Abandoned => "abandoned",
        }
    }
}

impl FromStr for GoalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(GoalStatus::NotStarted),
            "in_progress" => Ok(GoalStatus::InProgress),
            "completed" => Ok(GoalStatus::Completed),
            "abandoned" => Ok(GoalStatus::Abandoned),
            other => Err(CoreError::invalid(
                "status",
                format!("'{other}' is not a valid goal status"),
            )),
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A user goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub goal_type: GoalType,
    #[serde(default)]
    pub status: GoalStatus,
    pub deadline: Option<DateTime<Utc>>,
    /// Target repetitions per week for habit goals
    pub frequency: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// New goal in `not_started` state, stamped with the current time.
    pub fn new(user_id: Uuid, title: impl Into<String>, goal_type: GoalType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            description: String::new(),
            goal_type,
            status: GoalStatus::NotStarted,
            deadline: None,
            frequency: None,
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

    pub fn with_frequency(mut self, frequency: Option<u32>) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.status, GoalStatus::Completed | GoalStatus::Abandoned)
    }

    /// Checks a goal entered by hand.
    ///
    /// Deadline goals need a deadline and habit goals need a frequency. Goals
    /// proposed by the assistant skip this check.
    pub fn validate_manual(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::invalid("title", "title is required"));
        }
        match self.goal_type {
            GoalType::Deadline if self.deadline.is_none() => Err(CoreError::invalid(
                "deadline",
                "deadline is required for deadline goals",
            )),
            GoalType::Habit if self.frequency.is_none() => Err(CoreError::invalid(
                "frequency",
                "frequency is required for habit goals",
            )),
            _ => Ok(()),
        }
    }
}

/// Task totals for one goal, as supplied to the urgency engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub total_tasks: u32,
    pub completed_tasks: u32,
}

impl GoalProgress {
    pub fn new(total_tasks: u32, completed_tasks: u32) -> Self {
        Self {
            total_tasks,
            completed_tasks,
        }
    }
}
