mod config;
pub mod database;

pub use config::{BackendConfig, Config, DrawConfig, LoaderConfig, NotificationsConfig};
pub use database::{Database, DeadlineStore, HistoryStore};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/dailydraw[-dev]/` based on DAILYDRAW_ENV.
///
/// Set DAILYDRAW_ENV=dev to use the development data directory.
/// DAILYDRAW_HOME overrides the location entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("DAILYDRAW_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("DAILYDRAW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("dailydraw-dev")
            } else {
                base_dir.join("dailydraw")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
