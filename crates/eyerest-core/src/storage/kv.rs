//! Key-value persistence port.
//!
//! The timer controller reads its persisted state through this trait at
//! construction and writes back on every settings, mode or counter change.
//! Values are plain decimal text (or a lowercase word for enums).

use std::collections::HashMap;

use tracing::warn;

use crate::error::Result;

/// Keys the controller reads and writes.
pub mod keys {
    /// Work duration in minutes.
    pub const WORK_DURATION: &str = "work-duration";
    /// Relax duration in seconds.
    pub const RELAX_DURATION: &str = "relax-duration";
    pub const MODE: &str = "mode";
    pub const WORK_COMPLETED: &str = "work-completed-count";
    pub const RELAX_COMPLETED: &str = "relax-completed-count";
    pub const ALERT_KIND: &str = "alert-kind";
    pub const DISTANCE: &str = "distance-feet";
}

/// Minimal get/set store. No transactions, last write wins.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process store, used by tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with raw values, e.g. to simulate corrupted state.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Read a key, treating a failing store the same as an absent value.
pub(crate) fn read_or_absent<S: KvStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "failed to read persisted value, using default");
            None
        }
    }
}

/// Write a key; failures are logged and otherwise ignored.
pub(crate) fn write_logged<S: KvStore + ?Sized>(store: &mut S, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        warn!(key, value, error = %e, "failed to persist value");
    }
}
