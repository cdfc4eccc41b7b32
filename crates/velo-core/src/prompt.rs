//! System prompt for the planning assistant.
//!
//! The prompt carries the user's goals and tasks (with urgency computed at
//! render time) and pins the JSON reply shape that
//! [`crate::actions::validate`] accepts.

use chrono::{DateTime, Utc};
use indoc::{formatdoc, indoc};

use crate::goal::Goal;
use crate::task::priority_label;
use crate::urgency::ScoredTask;

const REPLY_FORMAT: &str = indoc! {r#"
    {
      "message": "Your conversational response here",
      "actions": [
        {
          "type": "create_goal",
          "goal": {
            "title": "string",
            "description": "string",
            "goal_type": "deadline|habit|exploration",
            "deadline": "YYYY-MM-DDT00:00:00Z or null"
          }
        },
        {
          "type": "create_task",
          "task": {
            "title": "string",
            "goal_index": 0,
            "user_priority": 1
          }
        },
        {
          "type": "reprioritize_task",
          "reprioritize": {
            "task_id": "id of an existing task",
            "new_priority": 3,
            "reason": "Deadline is in 2 days, bumping to high"
          }
        }
      ]
    }"#};

/// Render the system prompt for `user_name`.
///
/// `tasks` should already be scored against `now`; they are listed in the
/// order given.
pub fn build_system_prompt(
    assistant_name: &str,
    user_name: &str,
    goals: &[Goal],
    tasks: &[ScoredTask],
    now: DateTime<Utc>,
) -> String {
    let user_name = if user_name.trim().is_empty() {
        "the user"
    } else {
        user_name
    };

    formatdoc! {"
        You are {assistant_name}, a personal productivity assistant for {user_name}.
        Today's date is {today}.

        ## Current goals
        {goals}

        ## Current tasks (most urgent first)
        {tasks}

        ## Responsibilities
        - Work out what the user needs and help them plan it
        - Create goals and tasks when the user describes something they want to accomplish
        - Advise on prioritization using the urgency scores (1 to 10) above
        - Keep responses concise and actionable

        ## Planning rules
        - Every new goal should come with 3 to 5 concrete tasks
        - Infer as much as possible from the message instead of asking follow-up questions
        - Plans can be adjusted later from user feedback

        ## Reply format
        Reply with a single JSON object and nothing else, no markdown fences:
        {REPLY_FORMAT}

        - goal_type is one of: deadline, habit, exploration
        - user_priority and new_priority are 1 (Low), 2 (Medium) or 3 (High)
        - goal_index is the 0-based position of the goal among the create_goal actions of this reply
        - For a task under an EXISTING goal, set \"existing_goal_id\" instead of \"goal_index\"
        - When nothing needs to change, reply {{\"message\": \"...\", \"actions\": []}}
        ",
        today = now.format("%Y-%m-%d"),
        goals = format_goals(goals),
        tasks = format_tasks(tasks),
    }
}

fn format_deadline(deadline: Option<DateTime<Utc>>) -> String {
    deadline
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "no deadline".to_string())
}

fn format_goals(goals: &[Goal]) -> String {
    if goals.is_empty() {
        return "The user has no goals yet.".to_string();
    }

    goals
        .iter()
        .enumerate()
        .map(|(i, goal)| {
            let description = if goal.description.is_empty() {
                String::new()
            } else {
                format!(" - {}", goal.description)
            };
            format!(
                "{}. [ID: {}] {}{} ({}, {}, due: {})",
                i + 1,
                goal.id,
                goal.title,
                description,
                goal.goal_type,
                goal.status,
                format_deadline(goal.deadline)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_tasks(tasks: &[ScoredTask]) -> String {
    if tasks.is_empty() {
        return "The user has no tasks yet.".to_string();
    }

    tasks
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            let task = &scored.task;
            format!(
                "{}. [ID: {}] {} (priority: {}, urgency: {}, due: {}, completed: {}, goal: {})",
                i + 1,
                task.id,
                task.title,
                priority_label(task.user_priority),
                scored.urgency,
                format_deadline(task.deadline),
                if task.is_completed { "yes" } else { "no" },
                task.goal_id,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
