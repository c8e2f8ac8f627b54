//! Error types for quire-storage

use std::path::Path;

use thiserror::Error;

/// Errors returned by storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("I/O error: {0}")]
    Io(String),

    /// Error during serialization
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            StorageError::Io(err.to_string())
        } else {
            StorageError::Serialization(err.to_string())
        }
    }
}

impl StorageError {
    /// Create an I/O error naming the file it happened on
    pub fn io_at(path: &Path, err: &std::io::Error) -> Self {
        Self::Io(format!("{}: {}", path.display(), err))
    }
}
