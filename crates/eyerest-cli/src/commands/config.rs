use clap::Subcommand;
use eyerest_core::{Config, ConfigError};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value by its dotted key
    Get {
        /// Dotted key: timer.seconds_mode, timer.tick_ms, alert.player, log.filter, ...
        key: String,
    },
    /// Change one value and write config.toml
    Set {
        /// Dotted key
        key: String,
        /// Parsed as the key's type (bool, integer or string)
        value: String,
    },
    /// Print the whole configuration as JSON
    List,
    /// Overwrite config.toml with the built-in defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            // Echo the value as stored.
            let stored = config.get(&key).unwrap_or(value);
            println!("{key} = {stored}");
        }
        ConfigAction::List => {
            println!("{}", serde_json::to_string_pretty(&Config::load()?)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("defaults restored");
        }
    }
    Ok(())
}
