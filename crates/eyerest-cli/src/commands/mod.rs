pub mod config;
pub mod settings;
pub mod stats;
pub mod timer;

use eyerest_core::{AlertDispatcher, Config, Database, TimerController};

/// Controller over the persisted state in the data directory.
pub fn open_controller(
    config: &Config,
    mute: bool,
) -> Result<TimerController<Database>, Box<dyn std::error::Error>> {
    let alerts = if mute {
        AlertDispatcher::silent()
    } else {
        AlertDispatcher::new(config.audio_player())
    };
    Ok(TimerController::new(
        Database::open()?,
        alerts,
        config.controller_options(),
    ))
}
