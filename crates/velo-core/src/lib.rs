//! # Velo Core Library
//!
//! Business logic for Velo, a goal and task planner driven by a chat
//! assistant. Everything the CLI does goes through this crate.
//!
//! ## Architecture
//!
//! - **Urgency**: pure scoring of a task against its goal, recomputed on
//!   demand and never stored
//! - **Actions**: validation of raw assistant replies into typed action
//!   batches, and atomic execution of those batches
//! - **Storage**: SQLite persistence for goals, tasks and chat history, and
//!   TOML configuration
//! - **Chat**: the round-trip from user message to applied actions
//!
//! ## Key Components
//!
//! - [`urgency::score`]: urgency of one task, 1 to 10
//! - [`actions::validate`]: raw model text to [`ActionBatch`]
//! - [`actions::execute`]: apply a batch in one transaction
//! - [`Database`]: goal, task and chat persistence
//! - [`Assistant`]: chat orchestrator over a [`LanguageModel`]

pub mod actions;
pub mod chat;
pub mod error;
pub mod goal;
pub mod prompt;
pub mod storage;
pub mod task;
pub mod urgency;

pub use actions::{Action, ActionBatch, ActionExecutor, ExecutionResult};
pub use chat::{Assistant, ChatMessage, ChatReply, ChatRole, CommandModel, LanguageModel};
pub use error::{ConfigError, CoreError, DatabaseError, ModelError};
pub use goal::{Goal, GoalProgress, GoalStatus, GoalType};
pub use storage::{Config, Database};
pub use task::Task;
pub use urgency::{ScoredTask, UrgencyBreakdown};
