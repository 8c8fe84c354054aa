//! Core error types for remindroom-core.
//!
//! Invalid state transitions are not errors here: the reminder tolerates
//! them as no-ops. Errors are reserved for validation failures and for
//! failures reported by the external services (storage, notification).

use std::path::PathBuf;
use thiserror::Error;

use crate::reminder::ReminderId;

/// Core error type for remindroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence service errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The board has no reminder with this id
    #[error("Unknown reminder: {0}")]
    UnknownReminder(ReminderId),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored body could not be decoded
    #[error("Corrupt record for reminder {id}: {message}")]
    Corrupt { id: String, message: String },

    /// Backend refused the write (used by test doubles and remote stores)
    #[error("Write rejected: {0}")]
    Rejected(String),
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Notification delivery errors.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// The visual channel could not present the notification
    #[error("Failed to present notification for {reminder}: {message}")]
    PresentFailed { reminder: ReminderId, message: String },

    /// The audio channel failed
    #[error("Audio channel failed for {reminder}: {message}")]
    AudioFailed { reminder: ReminderId, message: String },
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty text field
    #[error("'{0}' must not be empty")]
    Empty(&'static str),

    /// Zero where a positive duration is required
    #[error("'{0}' must be a positive number of seconds")]
    NotPositive(&'static str),

    /// Duration too long to schedule in milliseconds
    #[error("'{field}' must be at most {max} seconds")]
    TooLarge { field: &'static str, max: u64 },

    /// Key that names no reminder field
    #[error("unknown reminder field: {0}")]
    UnknownField(String),

    /// Value that does not parse as the field's type
    #[error("cannot parse '{value}' as {expected}")]
    Unparsable {
        value: String,
        expected: &'static str,
    },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
