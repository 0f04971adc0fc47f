//! User-adjustable timer settings.
//!
//! Numeric settings never drop below [`MIN_SETTING`]. User input is coerced
//! rather than rejected, and stored values that fail to parse fall back to
//! the defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::phase::{AlertKind, Phase};
use crate::error::ValidationError;
use crate::storage::kv::{keys, read_or_absent, write_logged, KvStore};

/// Lower bound for every numeric setting.
pub const MIN_SETTING: u32 = 1;

pub const DEFAULT_WORK_MINUTES: u32 = 20;
pub const DEFAULT_RELAX_SECONDS: u32 = 20;
pub const DEFAULT_DISTANCE_FEET: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub work_minutes: u32,
    pub relax_seconds: u32,
    pub alert_kind: AlertKind,
    pub distance_feet: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            relax_seconds: DEFAULT_RELAX_SECONDS,
            alert_kind: AlertKind::Sound,
            distance_feet: DEFAULT_DISTANCE_FEET,
        }
    }
}

impl Settings {
    /// Countdown length for `phase` in seconds.
    ///
    /// With `seconds_mode` the work value is taken as seconds instead of
    /// minutes.
    pub fn duration_secs(&self, phase: Phase, seconds_mode: bool) -> u64 {
        match phase {
            Phase::Work if seconds_mode => u64::from(self.work_minutes),
            Phase::Work => u64::from(self.work_minutes).saturating_mul(60),
            Phase::Relax => u64::from(self.relax_seconds),
        }
    }

    /// Load from the store, substituting defaults for anything missing or malformed.
    pub fn load<S: KvStore + ?Sized>(store: &S) -> Self {
        let defaults = Self::default();
        Self {
            work_minutes: stored_positive(
                read_or_absent(store, keys::WORK_DURATION),
                defaults.work_minutes,
            ),
            relax_seconds: stored_positive(
                read_or_absent(store, keys::RELAX_DURATION),
                defaults.relax_seconds,
            ),
            alert_kind: read_or_absent(store, keys::ALERT_KIND)
                .as_deref()
                .and_then(AlertKind::parse_stored)
                .unwrap_or(defaults.alert_kind),
            distance_feet: stored_positive(
                read_or_absent(store, keys::DISTANCE),
                defaults.distance_feet,
            ),
        }
    }

    /// Current value of `field` as it is persisted.
    pub fn value_of(&self, field: SettingField) -> String {
        match field {
            SettingField::Work => self.work_minutes.to_string(),
            SettingField::Relax => self.relax_seconds.to_string(),
            SettingField::Distance => self.distance_feet.to_string(),
            SettingField::Alert => self.alert_kind.as_str().to_string(),
        }
    }

    /// Apply raw user input to `field`. Returns the stored text.
    pub fn apply(&mut self, field: SettingField, raw: &str) -> String {
        match field {
            SettingField::Work => self.work_minutes = coerce_positive(raw),
            SettingField::Relax => self.relax_seconds = coerce_positive(raw),
            SettingField::Distance => self.distance_feet = coerce_positive(raw),
            SettingField::Alert => {
                self.alert_kind = AlertKind::parse_stored(raw).unwrap_or_default()
            }
        }
        self.value_of(field)
    }

    pub(crate) fn persist<S: KvStore + ?Sized>(&self, store: &mut S, field: SettingField) {
        write_logged(store, field.key(), &self.value_of(field));
    }
}

/// A setting addressable by name from the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingField {
    Work,
    Relax,
    Distance,
    Alert,
}

impl SettingField {
    pub const ALL: [SettingField; 4] = [
        SettingField::Work,
        SettingField::Relax,
        SettingField::Distance,
        SettingField::Alert,
    ];

    /// Persistence key.
    pub fn key(self) -> &'static str {
        match self {
            SettingField::Work => keys::WORK_DURATION,
            SettingField::Relax => keys::RELAX_DURATION,
            SettingField::Distance => keys::DISTANCE,
            SettingField::Alert => keys::ALERT_KIND,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SettingField::Work => "work",
            SettingField::Relax => "relax",
            SettingField::Distance => "distance",
            SettingField::Alert => "alert",
        }
    }

    /// The phase whose countdown length this setting controls, if any.
    pub fn phase(self) -> Option<Phase> {
        match self {
            SettingField::Work => Some(Phase::Work),
            SettingField::Relax => Some(Phase::Relax),
            SettingField::Distance | SettingField::Alert => None,
        }
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" | "work-duration" => Ok(SettingField::Work),
            "relax" | "break" | "relax-duration" => Ok(SettingField::Relax),
            "distance" | "distance-feet" => Ok(SettingField::Distance),
            "alert" | "alert-kind" => Ok(SettingField::Alert),
            other => Err(ValidationError::UnknownSetting(other.to_string())),
        }
    }
}

/// Coerce user input to an integer >= [`MIN_SETTING`].
///
/// Reads the leading integer the way a number field does (`"12min"` is 12,
/// `"3.9"` is 3). No leading integer at all means the minimum.
pub fn coerce_positive(raw: &str) -> u32 {
    let trimmed = raw.trim();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: &str = {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() || negative {
        return MIN_SETTING;
    }
    digits
        .parse::<u32>()
        .unwrap_or(u32::MAX)
        .max(MIN_SETTING)
}

/// Strict parse for stored values: anything but a positive integer is `default`.
fn stored_positive(raw: Option<String>, default: u32) -> u32 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= i64::from(MIN_SETTING))
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        .unwrap_or(default)
}

/// Stored counters: anything but a non-negative integer is zero.
pub(crate) fn stored_count(raw: Option<String>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(0)
}
