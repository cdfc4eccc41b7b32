mod config;
pub mod database;
pub mod migrations;
pub mod store;

pub use config::{AssistantConfig, Config, DatabaseConfig, LoggingConfig, UserConfig};
pub use database::Database;
pub use store::GoalTaskStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the Velo data directory, creating it if needed.
///
/// `VELO_HOME` overrides the location outright. Otherwise this is
/// `~/.config/velo/`, or `~/.config/velo-dev/` when `VELO_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("VELO_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("VELO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("velo-dev")
            } else {
                base_dir.join("velo")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
