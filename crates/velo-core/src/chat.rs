//! Chat round-trips with the planning assistant.
//!
//! One [`Assistant::chat`] call records the user's message, renders the system
//! prompt from the user's current goals and tasks, asks the
//! [`LanguageModel`], validates the reply, records it, and applies its
//! actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;
use uuid::Uuid;

use crate::actions::{self, Action, ExecutionResult};
use crate::error::{CoreError, ModelError};
use crate::goal::{Goal, GoalStatus};
use crate::prompt::build_system_prompt;
use crate::storage::{AssistantConfig, Database};
use crate::urgency::score_tasks;

/// Environment variable carrying the system prompt to a [`CommandModel`].
pub const SYSTEM_PROMPT_ENV: &str = "VELO_SYSTEM_PROMPT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Anything other than `assistant` reads back as a user message.
    pub(crate) fn from_db(s: &str) -> Self {
        match s {
            "assistant" => ChatRole::Assistant,
            _ => ChatRole::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: ChatRole,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(user_id: Uuid, role: ChatRole, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Something that answers a user message given a system prompt.
pub trait LanguageModel {
    /// Return the model's raw reply text.
    fn complete(&self, system_prompt: &str, message: &str) -> Result<String, ModelError>;
}

/// Runs an external command as the language model.
///
/// The system prompt is passed in [`SYSTEM_PROMPT_ENV`], the user message on
/// stdin, and the reply is read from stdout.
#[derive(Debug, Clone)]
pub struct CommandModel {
    command: String,
    args: Vec<String>,
}

impl CommandModel {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// # Errors
    /// Returns [`ModelError::NotConfigured`] when no command is set.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, ModelError> {
        match config.command.as_deref().map(str::trim) {
            Some(command) if !command.is_empty() => Ok(Self::new(command, config.args.clone())),
            _ => Err(ModelError::NotConfigured),
        }
    }
}

impl LanguageModel for CommandModel {
    fn complete(&self, system_prompt: &str, message: &str) -> Result<String, ModelError> {
        let spawn_error = |source| ModelError::Spawn {
            command: self.command.clone(),
            source,
        };

        tracing::debug!(command = %self.command, "running assistant command");
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .env(SYSTEM_PROMPT_ENV, system_prompt)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Feed stdin while stdout is drained; a command may never read it.
        let stdin = child.stdin.take();
        let (written, output) = thread::scope(|s| {
            let writer = s.spawn(move || match stdin {
                Some(mut stdin) => match stdin.write_all(message.as_bytes()) {
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                        tracing::debug!("assistant command closed stdin early");
                        Ok(())
                    }
                    other => other,
                },
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (written, output)
        });
        let output = output.map_err(spawn_error)?;
        written.map_err(spawn_error)?;
        if !output.status.success() {
            return Err(ModelError::Failed {
                command: self.command.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Render the system prompt from the user's stored goals and tasks.
/// Abandoned goals and their tasks are left out.
///
/// # Errors
/// Returns an error if reading goals or tasks fails.
pub fn system_prompt_for(
    db: &Database,
    assistant_name: &str,
    user_id: Uuid,
    user_name: &str,
    now: DateTime<Utc>,
) -> Result<String, CoreError> {
    let goals: Vec<Goal> = db
        .list_goals(user_id)?
        .into_iter()
        .filter(|g| g.status != GoalStatus::Abandoned)
        .collect();
    let tasks: Vec<_> = db
        .list_tasks(user_id, None)?
        .into_iter()
        .filter(|t| goals.iter().any(|g| g.id == t.goal_id))
        .collect();

    let scored = score_tasks(&goals, &tasks, now);
    Ok(build_system_prompt(assistant_name, user_name, &goals, &scored, now))
}

/// Result of one chat round-trip.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub message: String,
    pub actions: Vec<Action>,
    pub result: ExecutionResult,
}

/// Chat orchestrator for one assistant persona.
pub struct Assistant<M> {
    name: String,
    model: M,
}

impl<M: LanguageModel> Assistant<M> {
    pub fn new(name: impl Into<String>, model: M) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }

    /// System prompt for `user_id` as of `now`.
    pub fn system_prompt(
        &self,
        db: &Database,
        user_id: Uuid,
        user_name: &str,
        now: DateTime<Utc>,
    ) -> Result<String, CoreError> {
        system_prompt_for(db, &self.name, user_id, user_name, now)
    }

    /// Send `message` on behalf of `user_id` and apply the reply.
    ///
    /// The user message is recorded before the model is called and the
    /// assistant message before its actions run, so a failed batch still
    /// leaves both in the history.
    ///
    /// # Errors
    /// Returns an error if the model fails, its reply does not validate, or the
    /// action batch fails (in which case none of its actions were applied).
    pub fn chat(
        &self,
        db: &mut Database,
        user_id: Uuid,
        user_name: &str,
        message: &str,
    ) -> Result<ChatReply, CoreError> {
        db.record_chat_message(&ChatMessage::new(user_id, ChatRole::User, message))?;

        let system_prompt = self.system_prompt(db, user_id, user_name, Utc::now())?;
        let raw = self.model.complete(&system_prompt, message)?;
        let batch = actions::validate(&raw)?;

        db.record_chat_message(&ChatMessage::new(
            user_id,
            ChatRole::Assistant,
            batch.message.clone(),
        ))?;

        let result = actions::execute(db, user_id, &batch)?;

        Ok(ChatReply {
            message: batch.message,
            actions: batch.actions,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::GoalType;
    use crate::task::Task;
    use std::cell::RefCell;

    struct ScriptedModel {
        reply: String,
        seen_prompt: RefCell<String>,
    }

    impl ScriptedModel {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen_prompt: RefCell::new(String::new()),
            }
        }
    }

    impl LanguageModel for &ScriptedModel {
        fn complete(&self, system_prompt: &str, _message: &str) -> Result<String, ModelError> {
            *self.seen_prompt.borrow_mut() = system_prompt.to_string();
            Ok(self.reply.clone())
        }
    }

    const PLAN: &str = r#"```json
    {"message": "Let's get you running.", "actions": [
        {"type": "create_goal", "goal": {"title": "Run a 5k", "goal_type": "deadline", "deadline": "2026-12-01"}},
        {"type": "create_task", "task": {"title": "Buy shoes", "goal_index": 0, "user_priority": 7}}
    ]}
    ```"#;

    #[test]
    fn chat_applies_actions_and_records_history() {
        let mut db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();
        let model = ScriptedModel::new(PLAN);
        let assistant = Assistant::new("Velo", &model);

        let reply = assistant.chat(&mut db, user, "Ana", "I want to run").unwrap();

        assert_eq!(reply.message, "Let's get you running.");
        assert_eq!(reply.actions.len(), 2);
        assert_eq!(reply.result.created_goal_ids.len(), 1);

        let tasks = db.list_tasks(user, None).unwrap();
        assert_eq!(tasks[0].user_priority, 2);

        let history = db.recent_chat_messages(user, 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "I want to run");
        assert_eq!(history[1].role, ChatRole::Assistant);
        assert!(model.seen_prompt.borrow().contains("for Ana."));
    }

    #[test]
    fn invalid_reply_executes_nothing() {
        let mut db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();
        let model = ScriptedModel::new("I made you some goals!");
        let assistant = Assistant::new("Velo", &model);

        let err = assistant.chat(&mut db, user, "", "help").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(db.list_goals(user).unwrap().is_empty());
        // Only the user message was recorded
        assert_eq!(db.recent_chat_messages(user, 10).unwrap().len(), 1);
    }

    #[test]
    fn prompt_hides_abandoned_goals() {
        let db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();
        let kept = Goal::new(user, "Keep me", GoalType::Habit);
        let dropped = Goal::new(user, "Drop me", GoalType::Habit);
        db.create_goal(&kept).unwrap();
        db.create_goal(&dropped).unwrap();
        db.create_task(&Task::new(user, dropped.id, "Hidden task", 2)).unwrap();
        db.abandon_goal(user, dropped.id).unwrap();

        let model = ScriptedModel::new("");
        let prompt = Assistant::new("Velo", &model)
            .system_prompt(&db, user, "Ana", Utc::now())
            .unwrap();
        assert!(prompt.contains("Keep me"));
        assert!(!prompt.contains("Drop me"));
        assert!(!prompt.contains("Hidden task"));
    }

    #[test]
    fn command_model_requires_command() {
        let config = AssistantConfig::default();
        assert!(matches!(
            CommandModel::from_config(&config),
            Err(ModelError::NotConfigured)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn command_model_pipes_prompt_and_message() {
        let model = CommandModel::new(
            "sh",
            vec!["-c".into(), r#"cat; printf '|%s' "$VELO_SYSTEM_PROMPT""#.into()],
        );
        let out = model.complete("be brief", "hello").unwrap();
        assert_eq!(out, "hello|be brief");
    }

    #[cfg(unix)]
    #[test]
    fn command_model_ignoring_stdin_still_replies() {
        let model = CommandModel::new(
            "sh",
            vec!["-c".into(), r#"printf '{"message":"ok","actions":[]}'"#.into()],
        );
        let message = "x".repeat(1 << 20);
        let out = model.complete("be brief", &message).unwrap();
        assert_eq!(out, r#"{"message":"ok","actions":[]}"#);
    }

    #[cfg(unix)]
    #[test]
    fn command_model_large_output_before_reading_stdin() {
        // Fill the stdout pipe before touching stdin
        let model = CommandModel::new(
            "sh",
            vec!["-c".into(), "head -c 200000 /dev/zero | tr '\\0' y; wc -c".into()],
        );
        let message = "z".repeat(200_000);
        let out = model.complete("", &message).unwrap();
        assert!(out.starts_with("yyyy"));
        assert_eq!(out[200_000..].trim(), "200000");
    }

    #[cfg(unix)]
    #[test]
    fn command_model_reports_failure() {
        let model = CommandModel::new("sh", vec!["-c".into(), "echo boom >&2; exit 3".into()]);
        match model.complete("", "") {
            Err(ModelError::Failed { status, stderr, .. }) => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn command_model_reports_missing_binary() {
        let model = CommandModel::new("velo-definitely-not-installed", Vec::new());
        assert!(matches!(
            model.complete("", ""),
            Err(ModelError::Spawn { .. })
        ));
    }
}
