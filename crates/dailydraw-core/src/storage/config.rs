//! TOML-based application configuration.
//!
//! Stores:
//! - Draw cycle timing (cycle length, cooldown, tick cadence)
//! - Entry loader retry policy
//! - Backend endpoint settings
//! - Notification preferences
//!
//! Configuration is stored at `~/.config/dailydraw/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::backend::BackendSettings;
use crate::draw::CoordinatorSettings;
use crate::entries::LoaderSettings;
use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawConfig {
    #[serde(default = "default_cycle_length_secs")]
    pub cycle_length_secs: u64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_entries_path")]
    pub entries_path: String,
    #[serde(default = "default_draw_path")]
    pub draw_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Forward notifications to the OS sink.
    #[serde(default = "default_true")]
    pub os_enabled: bool,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dailydraw/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub draw: DrawConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Upper bound for any configured duration (ten years).
const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;
const MAX_ATTEMPTS: u64 = 100;

fn seconds(key: &str, secs: u64) -> Result<chrono::Duration, ConfigError> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.into(),
            message: format!("{secs} seconds is out of range"),
        })
}

// Default functions
fn default_cycle_length_secs() -> u64 {
    24 * 60 * 60
}
fn default_cooldown_secs() -> u64 {
    5
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    1000
}
fn default_base_url() -> String {
    "http://127.0.0.1:3000".into()
}
fn default_entries_path() -> String {
    "/entries/current".into()
}
fn default_draw_path() -> String {
    "/draw/trigger".into()
}
fn default_request_timeout_secs() -> u64 {
    15
}
fn default_true() -> bool {
    true
}
fn default_history_capacity() -> usize {
    crate::broadcast::HISTORY_CAPACITY
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            cycle_length_secs: default_cycle_length_secs(),
            cooldown_secs: default_cooldown_secs(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            entries_path: default_entries_path(),
            draw_path: default_draw_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            os_enabled: true,
            history_capacity: default_history_capacity(),
            icon: None,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    // Optional string fields serialize as null when unset.
                    serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|d| d.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Reject values that would stall or spin the coordinator, or overflow
    /// when turned into durations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.into(),
            message,
        };
        let bounded = |key: &str, value: u64, min: u64, max: u64| {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(invalid(key, format!("must be between {min} and {max}")))
            }
        };
        bounded("draw.cycle_length_secs", self.draw.cycle_length_secs, 1, MAX_DURATION_SECS)?;
        bounded("draw.cooldown_secs", self.draw.cooldown_secs, 0, MAX_DURATION_SECS)?;
        bounded("draw.tick_interval_ms", self.draw.tick_interval_ms, 1, MAX_DURATION_SECS * 1000)?;
        bounded("loader.max_attempts", u64::from(self.loader.max_attempts), 1, MAX_ATTEMPTS)?;
        bounded("loader.backoff_base_ms", self.loader.backoff_base_ms, 0, MAX_DURATION_SECS * 1000)?;
        bounded(
            "backend.request_timeout_secs",
            self.backend.request_timeout_secs,
            1,
            MAX_DURATION_SECS,
        )?;
        if self.notifications.history_capacity == 0 {
            return Err(invalid("notifications.history_capacity", "must be at least 1".into()));
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse
    /// as the type of the existing field.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value and persist to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    pub fn coordinator_settings(&self) -> Result<CoordinatorSettings, ConfigError> {
        Ok(CoordinatorSettings {
            cycle_length: seconds("draw.cycle_length_secs", self.draw.cycle_length_secs)?,
            cooldown: seconds("draw.cooldown_secs", self.draw.cooldown_secs)?,
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.draw.tick_interval_ms)
    }

    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            max_attempts: self.loader.max_attempts,
            backoff_base: Duration::from_millis(self.loader.backoff_base_ms),
        }
    }

    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            base_url: self.backend.base_url.clone(),
            entries_path: self.backend.entries_path.clone(),
            draw_path: self.backend.draw_path.clone(),
            request_timeout: Duration::from_secs(self.backend.request_timeout_secs),
        }
    }
}
