//! Action pipeline errors.

use thiserror::Error;

use crate::error::DatabaseError;

/// A model reply rejected before any action ran.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("failed to parse assistant reply: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("action {index}: {action_type} is missing its payload")]
    MissingPayload {
        index: usize,
        action_type: &'static str,
    },

    #[error("action {index}: unknown type '{action_type}'")]
    UnknownActionType { index: usize, action_type: String },
}

impl ValidationError {
    /// Position of the offending action, if the reply decoded at all
    pub fn index(&self) -> Option<usize> {
        match self {
            ValidationError::Malformed(_) => None,
            ValidationError::MissingPayload { index, .. }
            | ValidationError::UnknownActionType { index, .. } => Some(*index),
        }
    }
}

/// A batch that failed part-way. Every mutation it made has been rolled back
/// by the time the caller sees this.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("action {index} ({action_type}): not found: {id}")]
    NotFound {
        index: usize,
        action_type: &'static str,
        id: String,
    },

    #[error("action {index} ({action_type}): {source}")]
    Persistence {
        index: usize,
        action_type: &'static str,
        #[source]
        source: DatabaseError,
    },

    /// Opening or committing the batch transaction failed
    #[error("action batch transaction failed: {0}")]
    Transaction(#[source] DatabaseError),
}

impl ExecutionError {
    /// Position of the failing action within the batch
    pub fn index(&self) -> Option<usize> {
        match self {
            ExecutionError::NotFound { index, .. } | ExecutionError::Persistence { index, .. } => {
                Some(*index)
            }
            ExecutionError::Transaction(_) => None,
        }
    }
}
