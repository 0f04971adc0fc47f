use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Which countdown is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Relax,
}

impl Phase {
    /// The phase that follows this one.
    pub fn other(self) -> Self {
        match self {
            Phase::Work => Phase::Relax,
            Phase::Relax => Phase::Work,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::Relax => "relax",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Phase::Work),
            // "break" is what the tab was called in the first web version.
            "relax" | "break" => Ok(Phase::Relax),
            other => Err(ValidationError::UnknownPhase(other.to_string())),
        }
    }
}

/// Whether a finished phase starts the next one on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Manual,
    Automate,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Manual => Mode::Automate,
            Mode::Automate => Mode::Manual,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Manual => "manual",
            Mode::Automate => "automate",
        }
    }

    /// Lenient parse used for stored values; anything unknown is `None`.
    pub fn parse_stored(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(Mode::Manual),
            "automate" | "auto" => Some(Mode::Automate),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a phase completion is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    #[default]
    Sound,
    Visual,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::Sound => "sound",
            AlertKind::Visual => "visual",
        }
    }

    pub fn parse_stored(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sound" => Some(AlertKind::Sound),
            "visual" => Some(AlertKind::Visual),
            _ => None,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
