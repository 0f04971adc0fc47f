//! # EyeRest Core Library
//!
//! Core logic for the EyeRest 20-20-20 timer: work for a while, then look at
//! something far away for a few seconds, then repeat. Front ends (the
//! `eyerest` CLI today) are thin views over this crate.
//!
//! ## Architecture
//!
//! - **Timer Controller**: a two-phase state machine that requires the caller
//!   to invoke `tick()` once per second
//! - **Timer Service**: tokio task that owns the one-second ticker and the
//!   automate-mode settling delay
//! - **Storage**: a key-value persistence port, SQLite storage for it and
//!   for completion history, and TOML-based configuration
//! - **Alerts**: a fire-and-forget audio cue on phase completion
//!
//! ## Key Components
//!
//! - [`TimerController`]: Core timer state machine
//! - [`TimerService`]: Async ticker around the controller
//! - [`KvStore`]: Persistence port the controller depends on
//! - [`Database`]: SQLite state and history
//! - [`Config`]: Application configuration management

pub mod alert;
pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use alert::{AlertDispatcher, AudioPlayer, CommandPlayer, SilentPlayer};
pub use error::{AlertError, ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use storage::{Config, Database, KvStore, MemoryStore, Stats};
pub use timer::{
    format_clock, AlertKind, ControllerOptions, Intent, Mode, Phase, SessionCounters,
    SettingField, Settings, Snapshot, TimerController, TimerService, Timing,
};
