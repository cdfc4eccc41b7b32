use clap::Subcommand;
use velo_core::{Config, ConfigError};

use super::Context;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "assistant.command", "logging.level")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value; "" clears optional values
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults, keeping the user id
    Reset,
}

pub fn run(action: ConfigAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key).ok_or(ConfigError::UnknownKey(key))?;
            ctx.emit(&value, |v| println!("{v}"))?;
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            ctx.emit(&config, |_| println!("ok"))?;
        }
        ConfigAction::List => {
            let config = Config::load()?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
        ConfigAction::Reset => {
            let user_id = Config::load_or_default().user.id;
            let mut config = Config::default();
            config.user.id = user_id;
            config.save()?;
            ctx.emit(&config, |_| println!("config reset to defaults"))?;
        }
    }
    Ok(())
}
