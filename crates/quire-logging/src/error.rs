//! Error types for quire-logging
//!
//! Only lifecycle operations return errors. Logging calls themselves never
//! fail; problems on the write path are reported through `tracing`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by log engine lifecycle operations
#[derive(Debug, Error)]
pub enum LogError {
    /// `startup` was called on an engine that is already open
    #[error("the log file is already opened")]
    AlreadyOpen,

    /// The engine is draining its queue and cannot be restarted yet
    #[error("the log engine is shutting down")]
    ShuttingDown,

    /// The destination file could not be opened
    #[error("failed to open log file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The writer thread could not be started
    #[error("failed to start log worker: {0}")]
    Worker(#[source] std::io::Error),

    /// Invalid configuration value
    #[error("invalid log configuration: {0}")]
    Config(String),
}

impl LogError {
    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error is lifecycle misuse rather than an I/O problem
    pub fn is_state_error(&self) -> bool {
        matches!(self, LogError::AlreadyOpen | LogError::ShuttingDown)
    }
}
