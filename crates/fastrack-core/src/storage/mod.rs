mod config;
pub mod database;
pub mod kv;
pub mod persisted;

pub use config::{Config, FastingConfig, NotificationsConfig};
pub use database::{Database, FastRecord, Stats};
pub use kv::{KeyValueStore, MemoryStore};
pub use persisted::{PersistedFast, DURATION_KEY, START_TIME_KEY};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the directory holding the database and config file.
///
/// `FASTRACK_DATA_DIR` wins when set. Otherwise `~/.config/fastrack[-dev]/`,
/// where FASTRACK_ENV=dev selects the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FASTRACK_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("FASTRACK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("fastrack-dev")
            } else {
                base_dir.join("fastrack")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
