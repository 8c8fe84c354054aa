mod config;
pub mod database;
mod store;

pub use config::{Config, EngineConfig, NotificationsConfig};
pub use database::SqliteStore;
pub use store::{MemoryStore, ReminderStore, StoreCall};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/remindroom[-dev]/` based on REMINDROOM_ENV.
///
/// Set REMINDROOM_ENV=dev to use the development data directory, or
/// REMINDROOM_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("REMINDROOM_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("REMINDROOM_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("remindroom-dev")
            } else {
                base_dir.join("remindroom")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
