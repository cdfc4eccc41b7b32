//! Task management commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use velo_core::task::{priority_label, PRIORITY_MEDIUM};
use velo_core::urgency::{breakdown_at, score_tasks};
use velo_core::{Config, CoreError, GoalStatus, Task};

use super::{format_deadline, open, parse_deadline_arg, parse_id, Context};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task under a goal
    Create {
        /// Task title
        title: String,
        /// Goal ID the task belongs to
        #[arg(long)]
        goal: String,
        /// Priority: 1 (low), 2 (medium) or 3 (high)
        #[arg(long, default_value_t = PRIORITY_MEDIUM)]
        priority: i64,
        #[arg(long)]
        description: Option<String>,
        /// Deadline (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        deadline: Option<String>,
        /// Estimated hours of work
        #[arg(long)]
        estimate: Option<f64>,
    },
    /// List tasks, most urgent first
    List {
        /// Only tasks of this goal
        #[arg(long)]
        goal: Option<String>,
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<i64>,
        /// New deadline; pass "" to clear
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        estimate: Option<f64>,
    },
    /// Mark a task completed
    Complete {
        /// Task ID
        id: String,
        /// Mark it not completed instead
        #[arg(long)]
        undo: bool,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Show how a task's urgency is made up
    Urgency {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let user_id = ctx.user_id(&mut config)?;
    let db = open(&config)?;

    let not_found = |id: String| CoreError::NotFound { entity: "task", id };

    match action {
        TaskAction::Create {
            title,
            goal,
            priority,
            description,
            deadline,
            estimate,
        } => {
            let goal_id = parse_id("goal", &goal)?;
            if db.get_goal(user_id, goal_id)?.is_none() {
                return Err(CoreError::NotFound { entity: "goal", id: goal }.into());
            }
            let deadline = match deadline {
                Some(raw) => parse_deadline_arg(&raw)?,
                None => None,
            };

            let mut task = Task::new(user_id, goal_id, title, priority)
                .with_description(description.unwrap_or_default())
                .with_deadline(deadline);
            task.estimated_hours = estimate;
            task.validate_manual()?;
            db.create_task(&task)?;

            ctx.emit(&task, |t| println!("Task created: {}", t.id))?;
        }
        TaskAction::List { goal, all } => {
            let goal_id = goal.as_deref().map(|g| parse_id("goal", g)).transpose()?;
            let goals = db.list_goals(user_id)?;
            let tasks = db.list_tasks(user_id, None)?;

            // Counts come from the full task list; filters apply afterwards
            let scored: Vec<_> = score_tasks(&goals, &tasks, Utc::now())
                .into_iter()
                .filter(|s| goal_id.map_or(true, |id| s.task.goal_id == id))
                .filter(|s| all || !s.task.is_completed)
                .filter(|s| {
                    goals
                        .iter()
                        .any(|g| g.id == s.task.goal_id && g.status != GoalStatus::Abandoned)
                })
                .collect();

            ctx.emit(&scored, |scored| {
                if scored.is_empty() {
                    println!("No tasks.");
                }
                for s in scored {
                    println!(
                        "{:>2}  {}  {:<6} due {:<10} {} {}",
                        s.urgency,
                        s.task.id,
                        priority_label(s.task.user_priority),
                        format_deadline(s.task.deadline),
                        if s.task.is_completed { "[x]" } else { "[ ]" },
                        s.task.title
                    );
                }
            })?;
        }
        TaskAction::Get { id } => {
            let task_id = parse_id("task", &id)?;
            let task = db.get_task(user_id, task_id)?.ok_or_else(|| not_found(id))?;

            ctx.emit(&task, |t| {
                println!("{} ({})", t.title, t.id);
                println!("  goal:      {}", t.goal_id);
                println!("  priority:  {}", priority_label(t.user_priority));
                println!("  deadline:  {}", format_deadline(t.deadline));
                if let Some(hours) = t.estimated_hours {
                    println!("  estimate:  {hours}h");
                }
                println!("  completed: {}", if t.is_completed { "yes" } else { "no" });
                if !t.description.is_empty() {
                    println!("  {}", t.description);
                }
            })?;
        }
        TaskAction::Update {
            id,
            title,
            description,
            priority,
            deadline,
            estimate,
        } => {
            let task_id = parse_id("task", &id)?;
            let mut task = db.get_task(user_id, task_id)?.ok_or_else(|| not_found(id))?;

            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = description {
                task.description = description;
            }
            if let Some(priority) = priority {
                task.user_priority = priority;
            }
            if let Some(raw) = deadline {
                task.deadline = parse_deadline_arg(&raw)?;
            }
            if estimate.is_some() {
                task.estimated_hours = estimate;
            }
            task.validate_manual()?;
            db.update_task(&task)?;

            ctx.emit(&task, |t| println!("Task updated: {}", t.id))?;
        }
        TaskAction::Complete { id, undo } => {
            let task_id = parse_id("task", &id)?;
            if db.set_task_completed(user_id, task_id, !undo)? == 0 {
                return Err(not_found(id).into());
            }
            ctx.emit(&task_id, |id| {
                if undo {
                    println!("Task reopened: {id}");
                } else {
                    println!("Task completed: {id}");
                }
            })?;
        }
        TaskAction::Delete { id } => {
            let task_id = parse_id("task", &id)?;
            if db.delete_task(user_id, task_id)? == 0 {
                return Err(not_found(id).into());
            }
            ctx.emit(&task_id, |id| println!("Task deleted: {id}"))?;
        }
        TaskAction::Urgency { id } => {
            let task_id = parse_id("task", &id)?;
            let task = db
                .get_task(user_id, task_id)?
                .ok_or_else(|| not_found(id))?;
            let goal = db
                .get_goal(user_id, task.goal_id)?
                .ok_or_else(|| CoreError::NotFound {
                    entity: "goal",
                    id: task.goal_id.to_string(),
                })?;
            let progress = db.goal_progress(user_id, goal.id)?;
            let breakdown = breakdown_at(&task, &goal, progress, Utc::now());

            ctx.emit(&breakdown, |b| {
                println!("{}: urgency {}", task.title, b.score);
                println!("  base (priority):   {}", b.base);
                println!("  deadline pressure: {}", b.deadline_pressure);
                println!(
                    "  goal lag:          {} ({}/{} tasks done)",
                    b.goal_lag, progress.completed_tasks, progress.total_tasks
                );
                println!("  staleness:         {}", b.staleness);
            })?;
        }
    }

    Ok(())
}
