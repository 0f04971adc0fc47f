mod config;
pub mod database;
pub mod kv;

pub use config::{AlertConfig, Config, LogConfig, TimerConfig};
pub use database::{CompletionRecord, Database, Stats};
pub use kv::{KvStore, MemoryStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/eyerest[-dev]/` based on EYEREST_ENV.
///
/// Set EYEREST_ENV=dev to use the development data directory, or
/// EYEREST_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("EYEREST_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("EYEREST_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("eyerest-dev")
            } else {
                base_dir.join("eyerest")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
