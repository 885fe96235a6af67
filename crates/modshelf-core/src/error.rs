//! Error types for Modshelf.
//!
//! Every fallible operation in the crate returns [`MigrationError`]. Fatal
//! variants abort a migration run; the rest are recorded per item and the
//! surrounding loop continues.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Modshelf library.
#[derive(Debug, Error)]
pub enum MigrationError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Legacy source errors
    #[error("Invalid legacy installation at {path}: {reason}")]
    InvalidSource { path: PathBuf, reason: String },

    #[error("Insufficient disk space: {required} bytes required, {available} bytes available")]
    InsufficientDiskSpace { required: u64, available: u64 },

    // Rule errors
    #[error("Invalid auto-detection pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    // Collaborator errors
    #[error("{service} failed: {message}")]
    Collaborator { service: String, message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Migration cancelled")]
    Cancelled,

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Modshelf operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

impl From<std::io::Error> for MigrationError {
    fn from(err: std::io::Error) -> Self {
        MigrationError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        MigrationError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<regex::Error> for MigrationError {
    fn from(err: regex::Error) -> Self {
        MigrationError::InvalidPattern {
            pattern: String::new(),
            message: err.to_string(),
        }
    }
}

impl MigrationError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MigrationError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a collaborator error for the named service.
    pub fn collaborator(service: impl Into<String>, message: impl Into<String>) -> Self {
        MigrationError::Collaborator {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole run rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigrationError::InvalidSource { .. }
                | MigrationError::InsufficientDiskSpace { .. }
                | MigrationError::Cancelled
        )
    }
}
