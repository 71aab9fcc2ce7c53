//! Core error types for dailydraw-core.
//!
//! Every fallible boundary (backend calls, the kv store, configuration) has
//! its own `thiserror` enum; `CoreError` ties them together for callers that
//! just want to propagate with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dailydraw-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Backend (entry source / winner selection) errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the remote collaborators.
///
/// All of these are treated as retryable by the entry loader; the winner
/// selection path never retries.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection, TLS or timeout failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(String),

    /// Backend answered but refused the request (e.g. nothing to draw)
    #[error("rejected by backend: {0}")]
    Rejected(String),

    /// Base URL is missing or cannot be joined with the endpoint path
    #[error("invalid backend url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Persistence-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    /// A stored value could not be parsed back
    #[error("Corrupted value under '{key}': {message}")]
    Corrupted { key: String, message: String },

    /// The data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            BackendError::Status {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
