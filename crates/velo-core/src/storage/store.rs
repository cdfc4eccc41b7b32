//! Owner-scoped goal/task operations used by the action executor.
//!
//! The trait is implemented for [`rusqlite::Connection`], so it is available on
//! a plain connection and, through deref, on a [`rusqlite::Transaction`]. The
//! executor runs an entire batch against one transaction.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::goal::Goal;
use crate::task::Task;

/// Persistence contract required by the action executor.
pub trait GoalTaskStore {
    /// Insert a new goal.
    fn insert_goal(&self, goal: &Goal) -> Result<(), DatabaseError>;

    /// Insert a new task.
    fn insert_task(&self, task: &Task) -> Result<(), DatabaseError>;

    /// Look up a goal by id, only if `user_id` owns it.
    fn find_goal(&self, user_id: Uuid, goal_id: Uuid) -> Result<Option<Goal>, DatabaseError>;

    /// Set a task's priority. Returns the number of rows affected, which is 0
    /// when the task does not exist or belongs to someone else.
    fn update_task_priority(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        priority: i64,
    ) -> Result<usize, DatabaseError>;
}

impl GoalTaskStore for Connection {
    fn insert_goal(&self, goal: &Goal) -> Result<(), DatabaseError> {
        self.execute(
            "INSERT INTO goals (id, user_id, title, description, goal_type, status,
                                deadline, frequency, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                goal.id.to_string(),
                goal.user_id.to_string(),
                goal.title,
                goal.description,
                goal.goal_type.as_str(),
                goal.status.as_str(),
                goal.deadline.map(|d| d.to_rfc3339()),
                goal.frequency,
                goal.created_at.to_rfc3339(),
                goal.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_task(&self, task: &Task) -> Result<(), DatabaseError> {
        self.execute(
            "INSERT INTO tasks (id, user_id, goal_id, title, description, deadline,
                                estimated_hours, user_priority, is_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                task.id.to_string(),
                task.user_id.to_string(),
                task.goal_id.to_string(),
                task.title,
                task.description,
                task.deadline.map(|d| d.to_rfc3339()),
                task.estimated_hours,
                task.user_priority,
                task.is_completed,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn find_goal(&self, user_id: Uuid, goal_id: Uuid) -> Result<Option<Goal>, DatabaseError> {
        let goal = self
            .query_row(
                &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1 AND user_id = ?2"),
                params![goal_id.to_string(), user_id.to_string()],
                row_to_goal,
            )
            .optional()?;
        Ok(goal)
    }

    fn update_task_priority(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        priority: i64,
    ) -> Result<usize, DatabaseError> {
        let affected = self.execute(
            "UPDATE tasks SET user_priority = ?1, updated_at = ?2
             WHERE id = ?3 AND user_id = ?4",
            params![
                priority,
                Utc::now().to_rfc3339(),
                task_id.to_string(),
                user_id.to_string(),
            ],
        )?;
        Ok(affected)
    }
}

pub(crate) const GOAL_COLUMNS: &str = "id, user_id, title, description, goal_type, status, \
     deadline, frequency, created_at, updated_at";

pub(crate) const TASK_COLUMNS: &str = "id, user_id, goal_id, title, description, deadline, \
     estimated_hours, user_priority, is_completed, created_at, updated_at";

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

pub(crate) fn get_uuid(row: &Row, idx: usize) -> Result<Uuid, rusqlite::Error> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_datetime(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_opt_datetime(
    row: &Row,
    idx: usize,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

/// Build a Goal from a row selected with [`GOAL_COLUMNS`]
pub(crate) fn row_to_goal(row: &Row) -> Result<Goal, rusqlite::Error> {
    let goal_type: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(Goal {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        goal_type: goal_type.parse().map_err(|e| conversion_error(4, e))?,
        status: status.parse().map_err(|e| conversion_error(5, e))?,
        deadline: get_opt_datetime(row, 6)?,
        frequency: row.get(7)?,
        created_at: get_datetime(row, 8)?,
        updated_at: get_datetime(row, 9)?,
    })
}

/// Build a Task from a row selected with [`TASK_COLUMNS`]
pub(crate) fn row_to_task(row: &Row) -> Result<Task, rusqlite::Error> {
    Ok(Task {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        goal_id: get_uuid(row, 2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        deadline: get_opt_datetime(row, 5)?,
        estimated_hours: row.get(6)?,
        user_priority: row.get(7)?,
        is_completed: row.get(8)?,
        created_at: get_datetime(row, 9)?,
        updated_at: get_datetime(row, 10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::GoalType;
    use crate::storage::migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn find_goal_is_owner_scoped() {
        let conn = conn();
        let owner = Uuid::new_v4();
        let goal = Goal::new(owner, "Write a novel", GoalType::Deadline);
        conn.insert_goal(&goal).unwrap();

        assert_eq!(conn.find_goal(owner, goal.id).unwrap(), Some(goal.clone()));
        assert!(conn.find_goal(Uuid::new_v4(), goal.id).unwrap().is_none());
    }

    #[test]
    fn priority_update_reports_affected_rows() {
        let conn = conn();
        let owner = Uuid::new_v4();
        let goal = Goal::new(owner, "Fitness", GoalType::Habit);
        conn.insert_goal(&goal).unwrap();
        let task = Task::new(owner, goal.id, "Stretch", 1);
        conn.insert_task(&task).unwrap();

        assert_eq!(conn.update_task_priority(owner, task.id, 3).unwrap(), 1);
        assert_eq!(
            conn.update_task_priority(Uuid::new_v4(), task.id, 3).unwrap(),
            0
        );
        assert_eq!(conn.update_task_priority(owner, Uuid::new_v4(), 3).unwrap(), 0);
    }
}
