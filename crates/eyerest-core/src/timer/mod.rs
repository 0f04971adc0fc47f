mod controller;
mod phase;
mod service;
mod settings;

pub use controller::{
    format_clock, phase_message, ControllerOptions, Intent, SessionCounters, Snapshot,
    TimerController,
};
pub use phase::{AlertKind, Mode, Phase};
pub use service::{TimerService, Timing, DEFAULT_SETTLE_DELAY, DEFAULT_TICK};
pub use settings::{coerce_positive, SettingField, Settings, MIN_SETTING};
