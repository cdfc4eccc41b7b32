//! Planning assistant commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use serde::Serialize;
use std::io::Read;
use velo_core::actions::{self, Action, ActionExecutor, ExecutionResult, OutcomeStatus};
use velo_core::chat::system_prompt_for;
use velo_core::{Assistant, ChatMessage, ChatReply, CommandModel, Config};

use super::{open, Context};

#[derive(Subcommand)]
pub enum AssistantAction {
    /// Print the system prompt the assistant would receive
    Prompt,
    /// Validate and apply a raw assistant reply
    Apply {
        /// File holding the reply; reads stdin when omitted or "-"
        file: Option<String>,
        /// Report what would change without keeping it
        #[arg(long)]
        dry_run: bool,
    },
    /// Send a message to the assistant and apply its plan
    Chat {
        /// Message text
        message: String,
    },
    /// Show recent chat messages
    History {
        /// Number of messages to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Serialize)]
struct Applied {
    message: String,
    actions: Vec<Action>,
    result: ExecutionResult,
}

pub fn run(action: AssistantAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let user_id = ctx.user_id(&mut config)?;
    let mut db = open(&config)?;

    match action {
        AssistantAction::Prompt => {
            let prompt = system_prompt_for(
                &db,
                &config.assistant.name,
                user_id,
                &config.user.name,
                Utc::now(),
            )?;
            ctx.emit(&prompt, |p| println!("{p}"))?;
        }
        AssistantAction::Apply { file, dry_run } => {
            let raw = read_reply(file.as_deref())?;
            let batch = actions::validate(&raw)?;
            let executor = if dry_run {
                ActionExecutor::dry_run()
            } else {
                ActionExecutor::new()
            };
            let result = executor.execute(&mut db, user_id, &batch)?;
            let applied = Applied {
                message: batch.message,
                actions: batch.actions,
                result,
            };

            ctx.emit(&applied, |a| {
                if !a.message.is_empty() {
                    println!("{}", a.message);
                }
                print_outcomes(&a.actions, &a.result);
                if dry_run {
                    println!("(dry run, nothing was saved)");
                }
            })?;
        }
        AssistantAction::Chat { message } => {
            let model = CommandModel::from_config(&config.assistant)?;
            let assistant = Assistant::new(config.assistant.name.clone(), model);
            let reply: ChatReply = assistant.chat(&mut db, user_id, &config.user.name, &message)?;

            ctx.emit(&reply, |r| {
                println!("{}", r.message);
                print_outcomes(&r.actions, &r.result);
            })?;
        }
        AssistantAction::History { limit } => {
            let messages: Vec<ChatMessage> = db.recent_chat_messages(user_id, limit)?;
            ctx.emit(&messages, |messages| {
                for m in messages {
                    println!(
                        "[{}] {}: {}",
                        m.created_at.format("%Y-%m-%d %H:%M"),
                        m.role.as_str(),
                        m.message
                    );
                }
            })?;
        }
    }

    Ok(())
}

fn read_reply(file: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    match file {
        Some(path) if path != "-" => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

fn print_outcomes(actions: &[Action], result: &ExecutionResult) {
    for outcome in &result.outcomes {
        let description = actions
            .get(outcome.index)
            .map(Action::description)
            .unwrap_or_default();
        match &outcome.status {
            OutcomeStatus::GoalCreated { goal_id } => println!("  + {description} ({goal_id})"),
            OutcomeStatus::TaskCreated { task_id, .. } => {
                println!("  + {description} ({task_id})")
            }
            OutcomeStatus::TaskReprioritized { .. } => println!("  ~ {description}"),
            OutcomeStatus::Skipped { reason } => println!("  - skipped: {reason}"),
        }
    }
}
