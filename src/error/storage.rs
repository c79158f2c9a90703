// Storage error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;
use std::path::Path;

/// Storage error code constants
///
/// Error code range: 4001-4003
pub struct StorageErrorCodes {}

impl StorageErrorCodes {
    /// Filesystem operation failed
    pub const IO: i32 = 4001;

    /// JSON encoding or decoding failed
    pub const SERIALIZATION: i32 = 4002;

    /// Requested record does not exist
    pub const NOT_FOUND: i32 = 4003;
}

/// Log a storage error with structured context
pub fn log_storage_error(err: &StorageError, context: &str) {
    error!(
        "Storage error in {}: code={}, component=ParticipantStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Persistence errors for participant data
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    Io { path: String, reason: String },
    Serialization { path: String, reason: String },
    NotFound { path: String },
}

impl StorageError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return StorageError::NotFound {
                path: path.display().to_string(),
            };
        }
        StorageError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn serialization(path: &Path, err: serde_json::Error) -> Self {
        StorageError::Serialization {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

impl ErrorCode for StorageError {
    fn code(&self) -> i32 {
        match self {
            StorageError::Io { .. } => StorageErrorCodes::IO,
            StorageError::Serialization { .. } => StorageErrorCodes::SERIALIZATION,
            StorageError::NotFound { .. } => StorageErrorCodes::NOT_FOUND,
        }
    }

    fn message(&self) -> String {
        match self {
            StorageError::Io { path, reason } => format!("I/O error on {}: {}", path, reason),
            StorageError::Serialization { path, reason } => {
                format!("Malformed JSON in {}: {}", path, reason)
            }
            StorageError::NotFound { path } => format!("No such record: {}", path),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StorageError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for StorageError {}
