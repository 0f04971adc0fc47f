use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Mode, Phase, SettingField};

/// Every state change in the controller produces an Event.
/// The view renders from snapshots; history and logging subscribe to these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseSelected {
        phase: Phase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero. `next` is already the active phase.
    PhaseCompleted {
        phase: Phase,
        next: Phase,
        duration_secs: u64,
        work_completed: u64,
        relax_completed: u64,
        /// The next phase starts by itself after the settling delay.
        auto_start: bool,
        at: DateTime<Utc>,
    },
    /// Automate mode started the next phase after settling.
    AutoStarted {
        phase: Phase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    SettingChanged {
        field: SettingField,
        value: String,
        /// The active countdown was recomputed and stopped.
        countdown_restarted: bool,
        at: DateTime<Utc>,
    },
    ModeChanged {
        mode: Mode,
        at: DateTime<Utc>,
    },
    SettingsPanel {
        open: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Whether this event asks the ticker to run the settling delay.
    pub fn wants_auto_start(&self) -> bool {
        matches!(self, Event::PhaseCompleted { auto_start: true, .. })
    }
}
