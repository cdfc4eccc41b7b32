//! Action execution results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to one action of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Position within the batch
    pub index: usize,
    /// Wire name of the action type
    pub action_type: String,
    pub status: OutcomeStatus,
}

/// Effect of an applied action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeStatus {
    GoalCreated { goal_id: Uuid },
    TaskCreated { task_id: Uuid, goal_id: Uuid },
    TaskReprioritized { task_id: Uuid, priority: i64 },
    /// Nothing was written
    Skipped { reason: String },
}

/// Log of one committed action batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// When the batch was committed
    pub executed_at: DateTime<Utc>,
    pub outcomes: Vec<ActionOutcome>,
    /// Goals created by this batch, in creation order
    pub created_goal_ids: Vec<Uuid>,
}

impl ExecutionResult {
    pub fn new(outcomes: Vec<ActionOutcome>, created_goal_ids: Vec<Uuid>) -> Self {
        Self {
            executed_at: Utc::now(),
            outcomes,
            created_goal_ids,
        }
    }

    /// Number of actions that wrote something
    pub fn applied_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.status, OutcomeStatus::Skipped { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.applied_count()
    }
}
