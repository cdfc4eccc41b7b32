//! Goal management commands for CLI.

use clap::Subcommand;
use serde::Serialize;
use velo_core::{Config, CoreError, Goal, GoalProgress, GoalStatus, GoalType};

use super::{format_deadline, open, parse_deadline_arg, parse_id, Context};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a new goal
    Create {
        /// Goal title
        title: String,
        /// Goal type: deadline, habit or exploration
        #[arg(long = "type", default_value = "exploration")]
        goal_type: String,
        /// Goal description
        #[arg(long)]
        description: Option<String>,
        /// Deadline (YYYY-MM-DD or RFC 3339), required for deadline goals
        #[arg(long)]
        deadline: Option<String>,
        /// Times per week, required for habit goals
        #[arg(long)]
        frequency: Option<u32>,
    },
    /// List goals
    List {
        /// Include abandoned goals
        #[arg(long)]
        all: bool,
        /// Only goals not yet completed or abandoned
        #[arg(long, conflicts_with = "all")]
        active: bool,
    },
    /// Get goal details with task counts
    Get {
        /// Goal ID
        id: String,
    },
    /// Update a goal
    Update {
        /// Goal ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// New type: deadline, habit or exploration
        #[arg(long = "type")]
        goal_type: Option<String>,
        /// New status: not_started, in_progress, completed or abandoned
        #[arg(long)]
        status: Option<String>,
        /// New deadline; pass "" to clear
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        frequency: Option<u32>,
    },
    /// Abandon a goal (it is kept, with status abandoned)
    Abandon {
        /// Goal ID
        id: String,
    },
}

#[derive(Serialize)]
struct GoalDetails {
    #[serde(flatten)]
    goal: Goal,
    #[serde(flatten)]
    progress: GoalProgress,
}

pub fn run(action: GoalAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let user_id = ctx.user_id(&mut config)?;
    let db = open(&config)?;

    match action {
        GoalAction::Create {
            title,
            goal_type,
            description,
            deadline,
            frequency,
        } => {
            let goal_type: GoalType = goal_type.parse()?;
            let deadline = match deadline {
                Some(raw) => parse_deadline_arg(&raw)?,
                None => None,
            };
            let goal = Goal::new(user_id, title, goal_type)
                .with_description(description.unwrap_or_default())
                .with_deadline(deadline)
                .with_frequency(frequency);
            goal.validate_manual()?;
            db.create_goal(&goal)?;

            ctx.emit(&goal, |g| println!("Goal created: {}", g.id))?;
        }
        GoalAction::List { all, active } => {
            let goals: Vec<Goal> = db
                .list_goals(user_id)?
                .into_iter()
                .filter(|g| all || g.status != GoalStatus::Abandoned)
                .filter(|g| !active || g.is_active())
                .collect();

            ctx.emit(&goals, |goals| {
                if goals.is_empty() {
                    println!("No goals.");
                }
                for g in goals {
                    println!(
                        "{}  {:<11} {:<11} due {:<10}  {}",
                        g.id,
                        g.goal_type,
                        g.status,
                        format_deadline(g.deadline),
                        g.title
                    );
                }
            })?;
        }
        GoalAction::Get { id } => {
            let goal_id = parse_id("goal", &id)?;
            let goal = db.get_goal(user_id, goal_id)?.ok_or(CoreError::NotFound {
                entity: "goal",
                id,
            })?;
            let progress = db.goal_progress(user_id, goal_id)?;
            let details = GoalDetails { goal, progress };

            ctx.emit(&details, |d| {
                println!("{} ({})", d.goal.title, d.goal.id);
                println!("  type:     {}", d.goal.goal_type);
                println!("  status:   {}", d.goal.status);
                println!("  deadline: {}", format_deadline(d.goal.deadline));
                if let Some(frequency) = d.goal.frequency {
                    println!("  frequency: {frequency}/week");
                }
                if !d.goal.description.is_empty() {
                    println!("  {}", d.goal.description);
                }
                println!(
                    "  tasks:    {}/{} completed",
                    d.progress.completed_tasks, d.progress.total_tasks
                );
            })?;
        }
        GoalAction::Update {
            id,
            title,
            description,
            goal_type,
            status,
            deadline,
            frequency,
        } => {
            let goal_id = parse_id("goal", &id)?;
            let mut goal = db.get_goal(user_id, goal_id)?.ok_or(CoreError::NotFound {
                entity: "goal",
                id,
            })?;

            if let Some(title) = title {
                goal.title = title;
            }
            if let Some(description) = description {
                goal.description = description;
            }
            if let Some(goal_type) = goal_type {
                goal.goal_type = goal_type.parse()?;
            }
            if let Some(status) = status {
                goal.status = status.parse()?;
            }
            if let Some(raw) = deadline {
                goal.deadline = parse_deadline_arg(&raw)?;
            }
            if frequency.is_some() {
                goal.frequency = frequency;
            }
            goal.validate_manual()?;
            db.update_goal(&goal)?;

            ctx.emit(&goal, |g| println!("Goal updated: {}", g.id))?;
        }
        GoalAction::Abandon { id } => {
            let goal_id = parse_id("goal", &id)?;
            if db.abandon_goal(user_id, goal_id)? == 0 {
                return Err(CoreError::NotFound { entity: "goal", id }.into());
            }
            ctx.emit(&goal_id, |id| println!("Goal abandoned: {id}"))?;
        }
    }

    Ok(())
}
