pub mod assistant;
pub mod config;
pub mod goal;
pub mod task;

use serde::Serialize;
use uuid::Uuid;
use velo_core::{Config, CoreError, Database};

/// Options shared by every subcommand.
pub struct Context {
    pub user: Option<Uuid>,
    pub json: bool,
}

impl Context {
    /// The acting user: `--user`, else `user.id` from the config. A fresh id
    /// is generated and saved the first time neither is set.
    pub fn user_id(&self, config: &mut Config) -> Result<Uuid, Box<dyn std::error::Error>> {
        if let Some(id) = self.user {
            return Ok(id);
        }
        if let Some(id) = config.user.id {
            return Ok(id);
        }

        let id = Uuid::new_v4();
        config.user.id = Some(id);
        config.save()?;
        tracing::info!(%id, "assigned new local user id");
        Ok(id)
    }

    /// Print `value` as pretty JSON, or run `text` to print it for humans.
    pub fn emit<T: Serialize>(
        &self,
        value: &T,
        text: impl FnOnce(&T),
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }
}

/// Open the database named by the config.
pub fn open(config: &Config) -> Result<Database, Box<dyn std::error::Error>> {
    let path = config.database_path()?;
    Ok(Database::open_at(path)?)
}

pub fn parse_id(entity: &'static str, raw: &str) -> Result<Uuid, CoreError> {
    Uuid::parse_str(raw.trim()).map_err(|_| CoreError::NotFound {
        entity,
        id: raw.to_string(),
    })
}

/// Parse `YYYY-MM-DD` or RFC 3339; an empty string clears the deadline.
pub fn parse_deadline_arg(
    raw: &str,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, CoreError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    velo_core::task::parse_deadline(raw)
        .map(Some)
        .ok_or_else(|| CoreError::InvalidInput {
            field: "deadline".into(),
            message: format!("'{raw}' is not a date (YYYY-MM-DD) or RFC 3339 timestamp"),
        })
}

pub fn format_deadline(deadline: Option<chrono::DateTime<chrono::Utc>>) -> String {
    deadline
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}
