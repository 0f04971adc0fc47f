use clap::Subcommand;
use eyerest_core::{Config, SettingField};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Get a setting (work, relax, distance, alert)
    Get {
        /// Setting name
        name: String,
    },
    /// Set a setting; numbers below 1 or non-numeric input become 1
    Set {
        /// Setting name
        name: String,
        /// New value
        value: String,
    },
    /// List all settings as JSON
    List,
}

pub fn run(action: SettingsAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut ctl = super::open_controller(config, true)?;

    match action {
        SettingsAction::Get { name } => {
            let field = name.parse::<SettingField>()?;
            println!("{}", ctl.settings().value_of(field));
        }
        SettingsAction::Set { name, value } => {
            let event = ctl.update_setting_by_name(&name, &value)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        SettingsAction::List => {
            println!("{}", serde_json::to_string_pretty(ctl.settings())?);
        }
    }
    Ok(())
}
