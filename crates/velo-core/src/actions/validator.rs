//! Assistant reply validation.
//!
//! Turns the raw text a language model returned into an [`ActionBatch`].
//! The model is told to answer with bare JSON but sometimes wraps it in a
//! markdown code fence anyway, so one leading and one trailing fence are
//! stripped before decoding.

use super::action::{Action, ActionBatch, RawAction, RawReply};
use super::error::ValidationError;
use crate::task::{is_valid_priority, PRIORITY_MEDIUM};

const FENCE: &str = "```";

/// Validate a raw model reply.
///
/// Decoding failures reject the whole reply. Actions are checked in order and
/// the first structural problem wins. The only repair made is resetting an
/// out-of-range `create_task` priority to medium.
///
/// # Errors
/// Returns [`ValidationError`] if the payload does not decode, an action lacks
/// the payload its type requires, or an action type is unrecognized.
pub fn validate(raw: &str) -> Result<ActionBatch, ValidationError> {
    let cleaned = strip_fences(raw);
    let reply: RawReply = serde_json::from_str(cleaned).map_err(ValidationError::Malformed)?;

    let actions = reply
        .actions
        .into_iter()
        .enumerate()
        .map(|(index, raw)| validate_action(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(actions = actions.len(), "validated assistant reply");

    Ok(ActionBatch {
        message: reply.message,
        actions,
    })
}

fn validate_action(index: usize, raw: RawAction) -> Result<Action, ValidationError> {
    let missing = |action_type: &'static str| ValidationError::MissingPayload { index, action_type };

    match raw.kind.as_str() {
        "create_goal" => {
            let goal = raw.goal.ok_or_else(|| missing("create_goal"))?;
            Ok(Action::CreateGoal { goal })
        }
        "create_task" => {
            let mut task = raw.task.ok_or_else(|| missing("create_task"))?;
            if !is_valid_priority(task.user_priority) {
                tracing::debug!(
                    index,
                    priority = task.user_priority,
                    "normalizing out-of-range task priority to medium"
                );
                task.user_priority = PRIORITY_MEDIUM;
            }
            Ok(Action::CreateTask { task })
        }
        "reprioritize_task" => {
            let reprioritize = raw
                .reprioritize
                .ok_or_else(|| missing("reprioritize_task"))?;
            Ok(Action::ReprioritizeTask { reprioritize })
        }
        other => Err(ValidationError::UnknownActionType {
            index,
            action_type: other.to_string(),
        }),
    }
}

/// Remove one leading fence (optionally followed by a language tag such as
/// `json`) and one trailing fence, plus surrounding whitespace.
pub fn strip_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix(FENCE) {
        s = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    }
    if let Some(rest) = s.strip_suffix(FENCE) {
        s = rest;
    }
    s.trim()
}
