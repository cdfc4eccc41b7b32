//! Assistant action pipeline.
//!
//! A raw model reply is first turned into an [`ActionBatch`] by [`validate`],
//! then applied atomically by [`execute`].

pub mod action;
pub mod error;
pub mod executor;
pub mod log;
pub mod validator;

pub use action::{Action, ActionBatch, GoalPayload, ReprioritizePayload, TaskPayload};
pub use error::{ExecutionError, ValidationError};
pub use executor::{apply_action, apply_batch, execute, ActionExecutor, ExecutionContext};
pub use log::{ActionOutcome, ExecutionResult, OutcomeStatus};
pub use validator::{strip_fences, validate};
