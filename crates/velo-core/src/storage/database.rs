//! SQLite-based goal, task and chat storage.
//!
//! Every read and write is scoped by the owning user. Goals are retired by
//! status change rather than deleted.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use super::migrations;
use super::store::{
    get_datetime, get_uuid, row_to_goal, row_to_task, GoalTaskStore, GOAL_COLUMNS, TASK_COLUMNS,
};
use crate::chat::{ChatMessage, ChatRole};
use crate::error::DatabaseError;
use crate::goal::{Goal, GoalProgress, GoalStatus};
use crate::task::Task;

/// SQLite database for goals, tasks and chat history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database file at `path`, creating and migrating it as needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "opened database");
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Begin a transaction. Dropping it without committing rolls back.
    pub fn transaction(&mut self) -> Result<Transaction<'_>, DatabaseError> {
        Ok(self.conn.transaction()?)
    }

    // === Goals ===

    pub fn create_goal(&self, goal: &Goal) -> Result<(), DatabaseError> {
        self.conn.insert_goal(goal)
    }

    pub fn get_goal(&self, user_id: Uuid, goal_id: Uuid) -> Result<Option<Goal>, DatabaseError> {
        self.conn.find_goal(user_id, goal_id)
    }

    /// All goals of a user, oldest first, abandoned ones included.
    pub fn list_goals(&self, user_id: Uuid) -> Result<Vec<Goal>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE user_id = ?1 ORDER BY created_at"
        ))?;
        let goals = stmt
            .query_map(params![user_id.to_string()], row_to_goal)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    /// Overwrite the editable fields of a goal. Returns rows affected.
    pub fn update_goal(&self, goal: &Goal) -> Result<usize, DatabaseError> {
        let affected = self.conn.execute(
            "UPDATE goals
             SET title = ?1, description = ?2, goal_type = ?3, status = ?4,
                 deadline = ?5, frequency = ?6, updated_at = ?7
             WHERE id = ?8 AND user_id = ?9",
            params![
                goal.title,
                goal.description,
                goal.goal_type.as_str(),
                goal.status.as_str(),
                goal.deadline.map(|d| d.to_rfc3339()),
                goal.frequency,
                Utc::now().to_rfc3339(),
                goal.id.to_string(),
                goal.user_id.to_string(),
            ],
        )?;
        Ok(affected)
    }

    /// Soft-delete a goal. Returns rows affected.
    pub fn abandon_goal(&self, user_id: Uuid, goal_id: Uuid) -> Result<usize, DatabaseError> {
        let affected = self.conn.execute(
            "UPDATE goals SET status = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            params![
                GoalStatus::Abandoned.as_str(),
                Utc::now().to_rfc3339(),
                goal_id.to_string(),
                user_id.to_string(),
            ],
        )?;
        Ok(affected)
    }

    /// Total and completed task counts for one goal.
    pub fn goal_progress(&self, user_id: Uuid, goal_id: Uuid) -> Result<GoalProgress, DatabaseError> {
        let (total, completed) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_completed), 0)
             FROM tasks WHERE goal_id = ?1 AND user_id = ?2",
            params![goal_id.to_string(), user_id.to_string()],
            |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)),
        )?;
        Ok(GoalProgress::new(total, completed))
    }

    // === Tasks ===

    pub fn create_task(&self, task: &Task) -> Result<(), DatabaseError> {
        self.conn.insert_task(task)
    }

    pub fn get_task(&self, user_id: Uuid, task_id: Uuid) -> Result<Option<Task>, DatabaseError> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"),
                params![task_id.to_string(), user_id.to_string()],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// Tasks of a user, optionally limited to one goal, oldest first.
    pub fn list_tasks(
        &self,
        user_id: Uuid,
        goal_id: Option<Uuid>,
    ) -> Result<Vec<Task>, DatabaseError> {
        let tasks = match goal_id {
            Some(goal_id) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE user_id = ?1 AND goal_id = ?2 ORDER BY created_at"
                ))?;
                let rows = stmt.query_map(
                    params![user_id.to_string(), goal_id.to_string()],
                    row_to_task,
                )?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY created_at"
                ))?;
                let rows = stmt.query_map(params![user_id.to_string()], row_to_task)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(tasks)
    }

    /// Overwrite the editable fields of a task and touch `updated_at`.
    /// Returns rows affected.
    pub fn update_task(&self, task: &Task) -> Result<usize, DatabaseError> {
        let affected = self.conn.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, deadline = ?3, estimated_hours = ?4,
                 user_priority = ?5, is_completed = ?6, updated_at = ?7
             WHERE id = ?8 AND user_id = ?9",
            params![
                task.title,
                task.description,
                task.deadline.map(|d| d.to_rfc3339()),
                task.estimated_hours,
                task.user_priority,
                task.is_completed,
                Utc::now().to_rfc3339(),
                task.id.to_string(),
                task.user_id.to_string(),
            ],
        )?;
        Ok(affected)
    }

    pub fn set_task_priority(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        priority: i64,
    ) -> Result<usize, DatabaseError> {
        self.conn.update_task_priority(user_id, task_id, priority)
    }

    pub fn set_task_completed(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        completed: bool,
    ) -> Result<usize, DatabaseError> {
        let affected = self.conn.execute(
            "UPDATE tasks SET is_completed = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            params![
                completed,
                Utc::now().to_rfc3339(),
                task_id.to_string(),
                user_id.to_string(),
            ],
        )?;
        Ok(affected)
    }

    pub fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> Result<usize, DatabaseError> {
        let affected = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![task_id.to_string(), user_id.to_string()],
        )?;
        Ok(affected)
    }

    // === Chat ===

    pub fn record_chat_message(&self, message: &ChatMessage) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO chat_messages (id, user_id, role, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id.to_string(),
                message.user_id.to_string(),
                message.role.as_str(),
                message.message,
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The most recent `limit` messages of a user, in chronological order.
    pub fn recent_chat_messages(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, role, message, created_at FROM chat_messages
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id.to_string(), limit as i64], |row| {
            let role: String = row.get(2)?;
            Ok(ChatMessage {
                id: get_uuid(row, 0)?,
                user_id: get_uuid(row, 1)?,
                role: ChatRole::from_db(&role),
                message: row.get(3)?,
                created_at: get_datetime(row, 4)?,
            })
        })?;
        let mut messages = rows.collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }
}
