//! Action execution.
//!
//! Applies a validated [`ActionBatch`] for one user inside a single database
//! transaction. Either every action of the batch takes effect or none does.

use uuid::Uuid;

use super::action::{Action, ActionBatch, GoalPayload, ReprioritizePayload, TaskPayload};
use super::error::ExecutionError;
use super::log::{ActionOutcome, ExecutionResult, OutcomeStatus};
use crate::error::DatabaseError;
use crate::goal::Goal;
use crate::storage::{Database, GoalTaskStore};
use crate::task::Task;

/// Goals created so far in the current batch, in order. `create_task` actions
/// refer to them by position through `goal_index`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    created_goal_ids: Vec<Uuid>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_goal_ids(&self) -> &[Uuid] {
        &self.created_goal_ids
    }

    /// Goal created at position `index`, if there is one.
    pub fn goal_at(&self, index: i64) -> Option<Uuid> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.created_goal_ids.get(i).copied())
    }

    fn with_goal(mut self, goal_id: Uuid) -> Self {
        self.created_goal_ids.push(goal_id);
        self
    }

    fn into_ids(self) -> Vec<Uuid> {
        self.created_goal_ids
    }
}

/// Apply one action on behalf of `user_id`.
///
/// Takes the context built by the preceding actions and returns the context
/// for the next one together with this action's outcome.
///
/// # Errors
/// Returns [`ExecutionError::NotFound`] when a referenced goal or task does
/// not exist for this user, or [`ExecutionError::Persistence`] when a write
/// fails. The caller is responsible for rolling back.
pub fn apply_action<S: GoalTaskStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    index: usize,
    action: &Action,
    ctx: ExecutionContext,
) -> Result<(ExecutionContext, ActionOutcome), ExecutionError> {
    let action_type = action.type_name();
    tracing::debug!(index, action = action_type, "applying action");

    let persistence = |source: DatabaseError| ExecutionError::Persistence {
        index,
        action_type,
        source,
    };
    let not_found = |id: &str| ExecutionError::NotFound {
        index,
        action_type,
        id: id.to_string(),
    };

    let (ctx, status) = match action {
        Action::CreateGoal { goal } => {
            let goal = new_goal(user_id, goal);
            store.insert_goal(&goal).map_err(persistence)?;
            (ctx.with_goal(goal.id), OutcomeStatus::GoalCreated { goal_id: goal.id })
        }
        Action::CreateTask { task } => {
            let goal_id = match resolve_goal(store, user_id, task, &ctx) {
                Ok(Some(goal_id)) => goal_id,
                Ok(None) => {
                    let reason = format!("no goal to attach task '{}' to", task.title);
                    tracing::warn!(index, goal_index = ?task.goal_index, "skipping task: {reason}");
                    return Ok((ctx, outcome(index, action_type, OutcomeStatus::Skipped { reason })));
                }
                Err(GoalLookup::NotFound(id)) => return Err(not_found(&id)),
                Err(GoalLookup::Database(e)) => return Err(persistence(e)),
            };

            let new_task = Task::new(user_id, goal_id, task.title.clone(), task.user_priority);
            store.insert_task(&new_task).map_err(persistence)?;
            (
                ctx,
                OutcomeStatus::TaskCreated {
                    task_id: new_task.id,
                    goal_id,
                },
            )
        }
        Action::ReprioritizeTask { reprioritize } => {
            let ReprioritizePayload {
                task_id,
                new_priority,
                ..
            } = reprioritize;
            let id = Uuid::parse_str(task_id.trim()).map_err(|_| not_found(task_id))?;
            let affected = store
                .update_task_priority(user_id, id, *new_priority)
                .map_err(persistence)?;
            if affected == 0 {
                return Err(not_found(task_id));
            }
            (
                ctx,
                OutcomeStatus::TaskReprioritized {
                    task_id: id,
                    priority: *new_priority,
                },
            )
        }
    };

    Ok((ctx, outcome(index, action_type, status)))
}

/// Apply every action of `batch` in order, threading the context through.
///
/// Stops at the first error without undoing anything; run it against a
/// transaction, as [`ActionExecutor::execute`] does, to get atomicity.
pub fn apply_batch<S: GoalTaskStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    batch: &ActionBatch,
) -> Result<ExecutionResult, ExecutionError> {
    let mut ctx = ExecutionContext::new();
    let mut outcomes = Vec::with_capacity(batch.actions.len());

    for (index, action) in batch.actions.iter().enumerate() {
        let (next, outcome) = apply_action(store, user_id, index, action, ctx)?;
        ctx = next;
        outcomes.push(outcome);
    }

    Ok(ExecutionResult::new(outcomes, ctx.into_ids()))
}

/// Runs action batches against a [`Database`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionExecutor {
    /// Roll back even on success
    dry_run: bool,
}

impl ActionExecutor {
    pub fn new() -> Self {
        Self { dry_run: false }
    }

    /// An executor that reports what a batch would do without keeping it.
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }

    /// Execute `batch` for `user_id` in one transaction.
    ///
    /// # Errors
    /// Any action error rolls the whole batch back before it is returned.
    /// Failing to open or commit the transaction yields
    /// [`ExecutionError::Transaction`].
    pub fn execute(
        &self,
        db: &mut Database,
        user_id: Uuid,
        batch: &ActionBatch,
    ) -> Result<ExecutionResult, ExecutionError> {
        let tx = db.transaction().map_err(ExecutionError::Transaction)?;

        let result = match apply_batch(&*tx, user_id, batch) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "rolling back action batch");
                // Dropping the transaction rolls it back
                drop(tx);
                return Err(e);
            }
        };

        if self.dry_run {
            tracing::debug!(actions = batch.actions.len(), "dry run, discarding batch");
            tx.rollback()
                .map_err(|e| ExecutionError::Transaction(e.into()))?;
        } else {
            tx.commit()
                .map_err(|e| ExecutionError::Transaction(e.into()))?;
            tracing::info!(
                %user_id,
                applied = result.applied_count(),
                skipped = result.skipped_count(),
                "committed action batch"
            );
        }

        Ok(result)
    }
}

/// Execute `batch` for `user_id`, committing on success.
pub fn execute(
    db: &mut Database,
    user_id: Uuid,
    batch: &ActionBatch,
) -> Result<ExecutionResult, ExecutionError> {
    ActionExecutor::new().execute(db, user_id, batch)
}

fn outcome(index: usize, action_type: &str, status: OutcomeStatus) -> ActionOutcome {
    ActionOutcome {
        index,
        action_type: action_type.to_string(),
        status,
    }
}

fn new_goal(user_id: Uuid, payload: &GoalPayload) -> Goal {
    Goal::new(user_id, payload.title.clone(), payload.goal_type)
        .with_description(payload.description.clone())
        .with_deadline(payload.deadline)
}

enum GoalLookup {
    NotFound(String),
    Database(DatabaseError),
}

/// Target goal of a `create_task`: a goal from this batch by position first,
/// then an existing goal of the user. `None` means neither was given.
fn resolve_goal<S: GoalTaskStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    task: &TaskPayload,
    ctx: &ExecutionContext,
) -> Result<Option<Uuid>, GoalLookup> {
    if let Some(goal_id) = task.goal_index.and_then(|i| ctx.goal_at(i)) {
        return Ok(Some(goal_id));
    }

    let raw = match task.existing_goal_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(None),
    };

    let goal_id = Uuid::parse_str(raw).map_err(|_| GoalLookup::NotFound(raw.to_string()))?;
    match store.find_goal(user_id, goal_id) {
        Ok(Some(_)) => Ok(Some(goal_id)),
        Ok(None) => Err(GoalLookup::NotFound(raw.to_string())),
        Err(e) => Err(GoalLookup::Database(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{GoalStatus, GoalType};

    fn goal_action(title: &str) -> Action {
        Action::CreateGoal {
            goal: GoalPayload {
                title: title.into(),
                description: String::new(),
                goal_type: GoalType::Exploration,
                deadline: None,
            },
        }
    }

    fn task_action(title: &str, goal_index: Option<i64>, existing: Option<String>) -> Action {
        Action::CreateTask {
            task: TaskPayload {
                title: title.into(),
                goal_index,
                existing_goal_id: existing,
                user_priority: 2,
            },
        }
    }

    fn reprioritize(task_id: &str, new_priority: i64) -> Action {
        Action::ReprioritizeTask {
            reprioritize: ReprioritizePayload {
                task_id: task_id.into(),
                new_priority,
                reason: "testing".into(),
            },
        }
    }

    fn batch(actions: Vec<Action>) -> ActionBatch {
        ActionBatch {
            message: String::new(),
            actions,
        }
    }

    #[test]
    fn tasks_attach_to_goals_from_same_batch() {
        let mut db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();

        let result = execute(
            &mut db,
            user,
            &batch(vec![
                goal_action("Learn Spanish"),
                goal_action("Get fit"),
                task_action("Duolingo daily", Some(0), None),
                task_action("Run 5k", Some(1), None),
            ]),
        )
        .unwrap();

        assert_eq!(result.created_goal_ids.len(), 2);
        let spanish = result.created_goal_ids[0];
        let fit = result.created_goal_ids[1];

        assert_eq!(db.list_tasks(user, Some(spanish)).unwrap()[0].title, "Duolingo daily");
        assert_eq!(db.list_tasks(user, Some(fit)).unwrap()[0].title, "Run 5k");

        let goal = db.get_goal(user, spanish).unwrap().unwrap();
        assert_eq!(goal.status, GoalStatus::NotStarted);
    }

    #[test]
    fn out_of_range_goal_index_is_skipped() {
        let mut db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();

        let result = execute(
            &mut db,
            user,
            &batch(vec![goal_action("Only goal"), task_action("Orphan", Some(2), None)]),
        )
        .unwrap();

        assert_eq!(result.applied_count(), 1);
        assert!(matches!(
            result.outcomes[1].status,
            OutcomeStatus::Skipped { .. }
        ));
        assert!(db.list_tasks(user, None).unwrap().is_empty());
    }

    #[test]
    fn goal_index_falls_back_to_existing_goal() {
        let mut db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();
        let existing = Goal::new(user, "Existing", GoalType::Habit);
        db.create_goal(&existing).unwrap();

        let result = execute(
            &mut db,
            user,
            &batch(vec![task_action("Practice", Some(5), Some(existing.id.to_string()))]),
        )
        .unwrap();

        assert_eq!(
            result.outcomes[0].status,
            OutcomeStatus::TaskCreated {
                task_id: db.list_tasks(user, None).unwrap()[0].id,
                goal_id: existing.id,
            }
        );
    }

    #[test]
    fn foreign_goal_is_not_found() {
        let mut db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let goal = Goal::new(owner, "Private", GoalType::Habit);
        db.create_goal(&goal).unwrap();

        let intruder = Uuid::new_v4();
        let err = execute(
            &mut db,
            intruder,
            &batch(vec![task_action("Sneak in", None, Some(goal.id.to_string()))]),
        )
        .unwrap_err();

        assert!(matches!(err, ExecutionError::NotFound { index: 0, .. }));
        assert!(db.list_tasks(owner, None).unwrap().is_empty());
    }

    #[test]
    fn reprioritize_updates_owned_task() {
        let mut db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();
        let goal = Goal::new(user, "Thesis", GoalType::Deadline);
        db.create_goal(&goal).unwrap();
        let task = Task::new(user, goal.id, "Write intro", 1);
        db.create_task(&task).unwrap();

        execute(&mut db, user, &batch(vec![reprioritize(&task.id.to_string(), 3)])).unwrap();
        assert_eq!(db.get_task(user, task.id).unwrap().unwrap().user_priority, 3);
    }

    #[test]
    fn not_found_rolls_back_earlier_actions() {
        let mut db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();

        let err = execute(
            &mut db,
            user,
            &batch(vec![
                goal_action("Will vanish"),
                task_action("Also vanishes", Some(0), None),
                reprioritize(&Uuid::new_v4().to_string(), 3),
            ]),
        )
        .unwrap_err();

        assert_eq!(err.index(), Some(2));
        assert!(db.list_goals(user).unwrap().is_empty());
        assert!(db.list_tasks(user, None).unwrap().is_empty());
    }

    #[test]
    fn unparsable_task_id_is_not_found() {
        let mut db = Database::open_memory().unwrap();
        let err = execute(
            &mut db,
            Uuid::new_v4(),
            &batch(vec![reprioritize("task-42", 2)]),
        )
        .unwrap_err();
        match err {
            ExecutionError::NotFound { id, .. } => assert_eq!(id, "task-42"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dry_run_reports_but_keeps_nothing() {
        let mut db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();

        let result = ActionExecutor::dry_run()
            .execute(&mut db, user, &batch(vec![goal_action("Preview")]))
            .unwrap();

        assert_eq!(result.created_goal_ids.len(), 1);
        assert!(db.list_goals(user).unwrap().is_empty());
    }

    #[test]
    fn context_threads_through_single_steps() {
        let db = Database::open_memory().unwrap();
        let user = Uuid::new_v4();

        let (ctx, _) =
            apply_action(db.conn(), user, 0, &goal_action("First"), ExecutionContext::new())
                .unwrap();
        assert_eq!(ctx.created_goal_ids().len(), 1);
        assert_eq!(ctx.goal_at(0), Some(ctx.created_goal_ids()[0]));
        assert_eq!(ctx.goal_at(-1), None);

        let (ctx, outcome) =
            apply_action(db.conn(), user, 1, &task_action("Step", Some(0), None), ctx).unwrap();
        assert_eq!(ctx.created_goal_ids().len(), 1);
        assert!(matches!(outcome.status, OutcomeStatus::TaskCreated { .. }));
    }
}
