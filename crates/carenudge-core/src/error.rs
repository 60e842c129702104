//! Core error types for carenudge-core.
//!
//! Layered thiserror hierarchy: `CoreError` at the top, with storage,
//! notification, and validation families below it.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for carenudge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Notification transport errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Background task registration errors
    #[error("Background registration error for '{task}': {message}")]
    Background { task: String, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the state store
    #[error("Failed to open state store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Data directory could not be resolved
    #[error("Failed to resolve data directory: {0}")]
    DataDir(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("State store migration failed: {0}")]
    MigrationFailed(String),

    /// Store is locked by another process
    #[error("State store is locked")]
    Locked,

    /// Persisted value failed to parse
    #[error("Corrupt value under '{key}': {message}")]
    Corrupt { key: String, message: String },
}

/// Notification transport errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The OS notification API rejected the operation
    #[error("Notification transport failed: {0}")]
    Transport(String),

    /// The platform does not support the requested feature
    #[error("Notification feature unsupported on this platform: {0}")]
    Unsupported(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Invalid identifier range
    #[error("Invalid identifier range: start ({start}) must not exceed end ({end})")]
    InvalidRange { start: u32, end: u32 },

    /// Notification identifier space exhausted
    #[error("Notification identifier space exhausted")]
    IdSpaceExhausted,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
