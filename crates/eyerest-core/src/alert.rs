//! Phase-completion alerts.
//!
//! A sound alert plays one cue through an [`AudioPlayer`]. Playback is
//! fire-and-forget: errors are logged and never reach the controller.
//! A visual alert does nothing here; the view shows the phase change.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::AlertError;
use crate::timer::AlertKind;

pub const DEFAULT_PLAYER: &str = "paplay";
pub const DEFAULT_SOUND_FILE: &str = "/usr/share/sounds/freedesktop/stereo/complete.oga";

/// Something that can play the completion cue.
pub trait AudioPlayer: Send {
    fn play(&self) -> Result<(), AlertError>;
}

/// Plays the cue by spawning an external player on a sound file.
///
/// The child is not waited on.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    player: String,
    sound_file: PathBuf,
}

impl CommandPlayer {
    pub fn new(player: impl Into<String>, sound_file: impl Into<PathBuf>) -> Self {
        Self {
            player: player.into(),
            sound_file: sound_file.into(),
        }
    }
}

impl Default for CommandPlayer {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYER, DEFAULT_SOUND_FILE)
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&self) -> Result<(), AlertError> {
        if !self.sound_file.exists() {
            return Err(AlertError::MissingAsset(self.sound_file.clone()));
        }
        Command::new(&self.player)
            .arg(&self.sound_file)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|mut child| {
                // Reaped off-thread; the cue never blocks the caller.
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            })
            .map_err(|source| AlertError::PlayerFailed {
                player: self.player.clone(),
                source,
            })
    }
}

/// Never makes a sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPlayer;

impl AudioPlayer for SilentPlayer {
    fn play(&self) -> Result<(), AlertError> {
        Ok(())
    }
}

/// Routes a completion to the configured alert kind.
pub struct AlertDispatcher {
    player: Box<dyn AudioPlayer>,
}

impl AlertDispatcher {
    pub fn new(player: impl AudioPlayer + 'static) -> Self {
        Self {
            player: Box::new(player),
        }
    }

    pub fn silent() -> Self {
        Self::new(SilentPlayer)
    }

    pub fn dispatch(&self, kind: AlertKind) {
        match kind {
            AlertKind::Sound => {
                if let Err(e) = self.player.play() {
                    warn!(error = %e, "alert sound failed");
                }
            }
            AlertKind::Visual => debug!("visual alert left to the view"),
        }
    }
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher").finish_non_exhaustive()
    }
}
