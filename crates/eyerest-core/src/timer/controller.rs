//! Timer controller implementation.
//!
//! The controller is a plain state machine over two phases. It does not own
//! a clock: the ticker (see [`TimerService`](super::TimerService)) or a test
//! calls `tick()` once per second while the countdown runs.
//!
//! ## State Transitions
//!
//! ```text
//! Idle-Work  <-- toggle_running -->  Running-Work
//!     ^                                   | tick reaches 0
//!     | select_phase / reset              v
//! Idle-Relax <-- toggle_running -->  Running-Relax
//! ```
//!
//! A completion flips the phase. In manual mode the clock stays at `00:00`
//! until the next start. In automate mode the next phase is loaded and starts
//! once `settle()` is called after the settling delay.
//!
//! ## Usage
//!
//! ```ignore
//! let mut ctl = TimerController::new(store, AlertDispatcher::silent(), ControllerOptions::default());
//! ctl.toggle_running();
//! // once per second:
//! if let Some(ev) = ctl.tick() {
//!     if ev.wants_auto_start() { /* wait a moment */ ctl.settle(); }
//! }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::phase::{Mode, Phase};
use super::settings::{stored_count, SettingField, Settings};
use crate::alert::AlertDispatcher;
use crate::error::Result;
use crate::events::Event;
use crate::storage::kv::{keys, read_or_absent, write_logged, KvStore};

/// Completed-phase counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub work_completed: u64,
    pub relax_completed: u64,
}

impl SessionCounters {
    pub fn get(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Work => self.work_completed,
            Phase::Relax => self.relax_completed,
        }
    }

    fn increment(&mut self, phase: Phase) -> u64 {
        let slot = match phase {
            Phase::Work => &mut self.work_completed,
            Phase::Relax => &mut self.relax_completed,
        };
        *slot = slot.saturating_add(1);
        *slot
    }
}

/// Construction-time knobs that are not user settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Read the work duration as seconds instead of minutes.
    pub seconds_mode: bool,
}

/// A view intent, dispatched through [`TimerController::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SelectPhase(Phase),
    ToggleRunning,
    UpdateSetting { field: SettingField, raw: String },
    ToggleMode,
    Reset,
    OpenSettings,
    CloseSettings,
}

/// Everything the view needs to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// `MM:SS`
    pub remaining: String,
    pub remaining_secs: u64,
    pub phase: Phase,
    pub is_running: bool,
    pub auto_start_pending: bool,
    pub mode: Mode,
    pub settings: Settings,
    pub counters: SessionCounters,
    pub settings_open: bool,
    pub message: String,
}

/// Core timer controller.
///
/// Owns all timer state. Persisted state (settings, mode, counters) goes
/// through the injected [`KvStore`].
#[derive(Debug)]
pub struct TimerController<S: KvStore> {
    store: S,
    alerts: AlertDispatcher,
    options: ControllerOptions,
    settings: Settings,
    mode: Mode,
    phase: Phase,
    remaining_secs: u64,
    running: bool,
    auto_start_pending: bool,
    counters: SessionCounters,
    settings_open: bool,
    /// Bumped whenever the running flag, the phase or the active duration
    /// changes. The ticker re-arms when it moves.
    generation: u64,
}

impl<S: KvStore> TimerController<S> {
    /// Load persisted state from `store` and start idle in the work phase.
    pub fn new(store: S, alerts: AlertDispatcher, options: ControllerOptions) -> Self {
        let settings = Settings::load(&store);
        let mode = read_or_absent(&store, keys::MODE)
            .as_deref()
            .and_then(Mode::parse_stored)
            .unwrap_or_default();
        let counters = SessionCounters {
            work_completed: stored_count(read_or_absent(&store, keys::WORK_COMPLETED)),
            relax_completed: stored_count(read_or_absent(&store, keys::RELAX_COMPLETED)),
        };
        let remaining_secs = settings.duration_secs(Phase::Work, options.seconds_mode);
        debug!(?settings, %mode, ?counters, "timer controller loaded");
        Self {
            store,
            alerts,
            options,
            settings,
            mode,
            phase: Phase::Work,
            remaining_secs,
            running: false,
            auto_start_pending: false,
            counters,
            settings_open: false,
            generation: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn auto_start_pending(&self) -> bool {
        self.auto_start_pending
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    pub fn settings_open(&self) -> bool {
        self.settings_open
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Countdown length of `phase` under the current settings.
    pub fn duration_secs(&self, phase: Phase) -> u64 {
        self.settings.duration_secs(phase, self.options.seconds_mode)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            remaining: format_clock(self.remaining_secs),
            remaining_secs: self.remaining_secs,
            phase: self.phase,
            is_running: self.running,
            auto_start_pending: self.auto_start_pending,
            mode: self.mode,
            settings: self.settings.clone(),
            counters: self.counters,
            settings_open: self.settings_open,
            message: phase_message(self.phase, self.settings.distance_feet),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn apply(&mut self, intent: Intent) -> Option<Event> {
        match intent {
            Intent::SelectPhase(phase) => Some(self.select_phase(phase)),
            Intent::ToggleRunning => Some(self.toggle_running()),
            Intent::UpdateSetting { field, raw } => Some(self.update_setting(field, &raw)),
            Intent::ToggleMode => Some(self.toggle_mode()),
            Intent::Reset => Some(self.reset()),
            Intent::OpenSettings => self.set_settings_open(true),
            Intent::CloseSettings => self.set_settings_open(false),
        }
    }

    pub fn select_phase(&mut self, phase: Phase) -> Event {
        self.phase = phase;
        self.recompute_remaining();
        debug!(%phase, remaining = self.remaining_secs, "phase selected");
        Event::PhaseSelected {
            phase,
            duration_secs: self.remaining_secs,
            at: Utc::now(),
        }
    }

    /// Start or pause. Starting from `00:00` (after a manual completion)
    /// first re-derives the current phase's full duration.
    pub fn toggle_running(&mut self) -> Event {
        self.auto_start_pending = false;
        self.running = !self.running;
        if self.running && self.remaining_secs == 0 {
            self.remaining_secs = self.duration_secs(self.phase);
        }
        self.bump_generation();
        if self.running {
            debug!(phase = %self.phase, remaining = self.remaining_secs, "countdown started");
            Event::TimerStarted {
                phase: self.phase,
                remaining_secs: self.remaining_secs,
                at: Utc::now(),
            }
        } else {
            debug!(phase = %self.phase, remaining = self.remaining_secs, "countdown paused");
            Event::TimerPaused {
                phase: self.phase,
                remaining_secs: self.remaining_secs,
                at: Utc::now(),
            }
        }
    }

    /// Call once per second. Returns `Some(Event::PhaseCompleted)` when the
    /// countdown reaches zero.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return None;
        }
        Some(self.complete_phase())
    }

    /// Start the pending automate-mode phase. No-op if nothing is pending.
    pub fn settle(&mut self) -> Option<Event> {
        if !self.auto_start_pending {
            return None;
        }
        self.auto_start_pending = false;
        self.running = true;
        self.bump_generation();
        debug!(phase = %self.phase, "auto-started after settling");
        Some(Event::AutoStarted {
            phase: self.phase,
            duration_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Back to idle work with zeroed counters.
    pub fn reset(&mut self) -> Event {
        self.phase = Phase::Work;
        self.recompute_remaining();
        self.counters = SessionCounters::default();
        self.persist_counter(Phase::Work);
        self.persist_counter(Phase::Relax);
        info!("timer reset");
        Event::TimerReset { at: Utc::now() }
    }

    /// Set a setting from raw view input. Never rejects a value.
    ///
    /// Changing the active phase's duration restarts its countdown, stopped.
    pub fn update_setting(&mut self, field: SettingField, raw: &str) -> Event {
        let before = self.duration_secs(self.phase);
        let value = self.settings.apply(field, raw);
        self.settings.persist(&mut self.store, field);

        let countdown_restarted =
            field.phase() == Some(self.phase) && self.duration_secs(self.phase) != before;
        if countdown_restarted {
            self.recompute_remaining();
        }
        debug!(%field, %value, countdown_restarted, "setting updated");
        Event::SettingChanged {
            field,
            value,
            countdown_restarted,
            at: Utc::now(),
        }
    }

    /// Like [`update_setting`](Self::update_setting) with the field given by name.
    pub fn update_setting_by_name(&mut self, name: &str, raw: &str) -> Result<Event> {
        let field = name.parse::<SettingField>()?;
        Ok(self.update_setting(field, raw))
    }

    pub fn toggle_mode(&mut self) -> Event {
        self.mode = self.mode.toggled();
        if self.mode == Mode::Manual {
            self.auto_start_pending = false;
        }
        write_logged(&mut self.store, keys::MODE, self.mode.as_str());
        debug!(mode = %self.mode, "mode toggled");
        Event::ModeChanged {
            mode: self.mode,
            at: Utc::now(),
        }
    }

    pub fn open_settings(&mut self) -> Option<Event> {
        self.set_settings_open(true)
    }

    pub fn close_settings(&mut self) -> Option<Event> {
        self.set_settings_open(false)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn set_settings_open(&mut self, open: bool) -> Option<Event> {
        if self.settings_open == open {
            return None;
        }
        self.settings_open = open;
        Some(Event::SettingsPanel {
            open,
            at: Utc::now(),
        })
    }

    fn complete_phase(&mut self) -> Event {
        let finished = self.phase;
        let duration_secs = self.duration_secs(finished);

        self.alerts.dispatch(self.settings.alert_kind);
        self.counters.increment(finished);
        self.persist_counter(finished);

        self.phase = finished.other();
        let auto_start = self.mode == Mode::Automate;
        if auto_start {
            self.recompute_remaining();
            self.auto_start_pending = true;
        } else {
            // Manual: stay at 00:00 until the next start or phase selection.
            self.running = false;
            self.bump_generation();
        }

        info!(
            phase = %finished,
            next = %self.phase,
            work_completed = self.counters.work_completed,
            relax_completed = self.counters.relax_completed,
            auto_start,
            "phase completed"
        );
        Event::PhaseCompleted {
            phase: finished,
            next: self.phase,
            duration_secs,
            work_completed: self.counters.work_completed,
            relax_completed: self.counters.relax_completed,
            auto_start,
            at: Utc::now(),
        }
    }

    /// Re-derive the countdown from phase and settings, stopped.
    fn recompute_remaining(&mut self) {
        self.remaining_secs = self.duration_secs(self.phase);
        self.running = false;
        self.auto_start_pending = false;
        self.bump_generation();
    }

    fn persist_counter(&mut self, phase: Phase) {
        let key = match phase {
            Phase::Work => keys::WORK_COMPLETED,
            Phase::Relax => keys::RELAX_COMPLETED,
        };
        write_logged(&mut self.store, key, &self.counters.get(phase).to_string());
    }

    fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// `MM:SS`, minutes padded to at least two digits.
pub fn format_clock(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Cue text shown under the clock.
pub fn phase_message(phase: Phase, distance_feet: u32) -> String {
    match phase {
        Phase::Work => "Working time".to_string(),
        Phase::Relax => format!("Time for a break! Look at something {distance_feet} feet away."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::timer::AlertKind;

    fn controller() -> TimerController<MemoryStore> {
        TimerController::new(
            MemoryStore::new(),
            AlertDispatcher::silent(),
            ControllerOptions { seconds_mode: true },
        )
    }

    #[test]
    fn starts_idle_in_work() {
        let ctl = controller();
        assert_eq!(ctl.phase(), Phase::Work);
        assert!(!ctl.is_running());
        assert_eq!(ctl.remaining_secs(), 20);
        assert_eq!(ctl.counters(), SessionCounters::default());
    }

    #[test]
    fn minutes_mode_uses_minutes_for_work() {
        let ctl = TimerController::new(
            MemoryStore::new(),
            AlertDispatcher::silent(),
            ControllerOptions::default(),
        );
        assert_eq!(ctl.remaining_secs(), 20 * 60);
        assert_eq!(ctl.snapshot().remaining, "20:00");
    }

    #[test]
    fn tick_is_noop_while_idle() {
        let mut ctl = controller();
        assert!(ctl.tick().is_none());
        assert_eq!(ctl.remaining_secs(), 20);
    }

    #[test]
    fn toggle_running_pauses_and_resumes() {
        let mut ctl = controller();
        assert!(matches!(ctl.toggle_running(), Event::TimerStarted { .. }));
        ctl.tick();
        assert!(matches!(
            ctl.toggle_running(),
            Event::TimerPaused { remaining_secs: 19, .. }
        ));
        assert!(ctl.tick().is_none());
        assert_eq!(ctl.remaining_secs(), 19);
    }

    #[test]
    fn select_phase_stops_and_recomputes() {
        let mut ctl = controller();
        ctl.toggle_running();
        ctl.tick();
        let gen = ctl.generation();
        ctl.select_phase(Phase::Relax);
        assert_eq!(ctl.phase(), Phase::Relax);
        assert_eq!(ctl.remaining_secs(), 20);
        assert!(!ctl.is_running());
        assert!(ctl.generation() > gen);
    }

    #[test]
    fn one_second_phase_completes_on_first_tick() {
        let mut ctl = controller();
        ctl.update_setting(SettingField::Work, "1");
        ctl.toggle_running();
        assert!(ctl.tick().is_some());
        assert_eq!(ctl.counters().work_completed, 1);
    }

    #[test]
    fn manual_completion_rests_at_zero_until_started() {
        let mut ctl = controller();
        ctl.update_setting(SettingField::Work, "2");
        ctl.update_setting(SettingField::Relax, "3");
        ctl.toggle_running();
        ctl.tick();
        assert!(ctl.tick().is_some());
        assert_eq!(ctl.phase(), Phase::Relax);
        assert_eq!(ctl.remaining_secs(), 0);
        assert_eq!(ctl.snapshot().remaining, "00:00");
        assert!(!ctl.is_running());

        assert!(ctl.tick().is_none());
        assert!(matches!(
            ctl.toggle_running(),
            Event::TimerStarted { phase: Phase::Relax, remaining_secs: 3, .. }
        ));
        assert!(ctl.tick().is_none());
        assert_eq!(ctl.remaining_secs(), 2);
        assert_eq!(ctl.counters().relax_completed, 0);
    }

    #[test]
    fn inactive_phase_setting_leaves_countdown_alone() {
        let mut ctl = controller();
        ctl.toggle_running();
        ctl.tick();
        let ev = ctl.update_setting(SettingField::Relax, "45");
        assert!(matches!(
            ev,
            Event::SettingChanged { countdown_restarted: false, .. }
        ));
        assert!(ctl.is_running());
        assert_eq!(ctl.remaining_secs(), 19);
    }

    #[test]
    fn same_value_does_not_restart() {
        let mut ctl = controller();
        ctl.toggle_running();
        ctl.tick();
        ctl.update_setting(SettingField::Work, "20");
        assert!(ctl.is_running());
        assert_eq!(ctl.remaining_secs(), 19);
    }

    #[test]
    fn settings_panel_visibility() {
        let mut ctl = controller();
        assert!(ctl.apply(Intent::OpenSettings).is_some());
        assert!(ctl.settings_open());
        assert!(ctl.apply(Intent::OpenSettings).is_none());
        assert!(ctl.apply(Intent::CloseSettings).is_some());
        assert!(!ctl.snapshot().settings_open);
    }

    #[test]
    fn toggle_mode_keeps_countdown() {
        let mut ctl = controller();
        ctl.toggle_running();
        ctl.tick();
        ctl.toggle_mode();
        assert_eq!(ctl.mode(), Mode::Automate);
        assert!(ctl.is_running());
        assert_eq!(ctl.remaining_secs(), 19);
        assert_eq!(ctl.store().get(keys::MODE).unwrap().as_deref(), Some("automate"));
    }

    #[test]
    fn switching_to_manual_cancels_pending_start() {
        let mut ctl = controller();
        ctl.toggle_mode();
        ctl.update_setting(SettingField::Work, "1");
        ctl.toggle_running();
        assert!(ctl.tick().unwrap().wants_auto_start());
        ctl.toggle_mode();
        assert!(ctl.settle().is_none());
        assert!(!ctl.is_running());
    }

    #[test]
    fn unknown_setting_name_is_rejected() {
        let mut ctl = controller();
        assert!(ctl.update_setting_by_name("volume", "3").is_err());
        assert!(ctl.update_setting_by_name("alert", "visual").is_ok());
        assert_eq!(ctl.settings().alert_kind, AlertKind::Visual);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(20 * 60), "20:00");
        assert_eq!(format_clock(100 * 60 + 1), "100:01");
    }

    #[test]
    fn relax_message_mentions_distance() {
        assert_eq!(
            phase_message(Phase::Relax, 20),
            "Time for a break! Look at something 20 feet away."
        );
        assert_eq!(phase_message(Phase::Work, 20), "Working time");
    }
}
