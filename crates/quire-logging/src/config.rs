//! Configuration types for the logging system

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LogError;
use crate::zone::LogZone;

/// Main logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum number of records waiting for the writer; producers block
    /// while the queue is full
    pub queue_capacity: usize,

    /// Call `sync_data` after every record
    pub sync_on_write: bool,

    /// Name of the writer thread
    pub worker_name: String,

    /// Zone used when the engine writes to a fixed path
    pub zone: ZoneConfig,

    /// Append a backtrace of the logging call to records carrying an error;
    /// `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE` must also enable capture
    pub capture_backtraces: bool,

    /// Rolling file output, used by
    /// [`LogContext::initialize_from_config`](crate::LogContext::initialize_from_config)
    pub file: Option<FileConfig>,

    /// The crate's own `tracing` diagnostics, installed by
    /// [`LogContext::install_diagnostics`](crate::LogContext::install_diagnostics)
    pub diagnostics: DiagnosticsConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64 * 1024,
            sync_on_write: false,
            worker_name: "quire-log-writer".to_string(),
            zone: ZoneConfig::default(),
            capture_backtraces: false,
            file: None,
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl LogConfig {
    /// Create a config for development (verbose diagnostics)
    pub fn development() -> Self {
        Self {
            capture_backtraces: true,
            diagnostics: DiagnosticsConfig {
                default_level: "debug".to_string(),
                ansi: true,
                ..DiagnosticsConfig::default()
            },
            ..Default::default()
        }
    }

    /// Create a config for production (daily files, synced writes)
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            sync_on_write: true,
            file: Some(FileConfig {
                directory: log_dir,
                ..FileConfig::default()
            }),
            ..Default::default()
        }
    }

    /// Create a config for testing (quiet, small queue)
    pub fn testing() -> Self {
        Self {
            queue_capacity: 1024,
            zone: ZoneConfig::Utc,
            diagnostics: DiagnosticsConfig {
                default_level: "warn".to_string(),
                ..DiagnosticsConfig::default()
            },
            ..Default::default()
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), LogError> {
        if self.queue_capacity == 0 {
            return Err(LogError::config("queue_capacity must be at least 1"));
        }
        if self.worker_name.is_empty() {
            return Err(LogError::config("worker_name must not be empty"));
        }
        self.zone.to_zone()?;
        if let Some(file) = &self.file
            && file.prefix.is_empty()
        {
            return Err(LogError::config("file.prefix must not be empty"));
        }
        Ok(())
    }
}

/// Serializable form of [`LogZone`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZoneConfig {
    #[default]
    Local,
    Utc,
    Offset { seconds_east: i32 },
}

impl ZoneConfig {
    pub fn to_zone(self) -> Result<LogZone, LogError> {
        match self {
            ZoneConfig::Local => Ok(LogZone::Local),
            ZoneConfig::Utc => Ok(LogZone::Utc),
            ZoneConfig::Offset { seconds_east } => LogZone::fixed(seconds_east)
                .ok_or_else(|| LogError::config(format!("zone offset {seconds_east}s is out of range"))),
        }
    }
}

/// Rolling file output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Directory for log files
    pub directory: PathBuf,
    /// File name prefix
    pub prefix: String,
    /// Rotation strategy
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "quire".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

/// File rotation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RotationStrategy {
    /// Rotate daily
    #[default]
    Daily,
    /// Rotate hourly
    Hourly,
    /// Never rotate
    Never,
}

/// Configuration for the crate's own `tracing` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Default level (can be overridden by RUST_LOG)
    pub default_level: String,
    /// Include ANSI colors
    pub ansi: bool,
    /// Include the event target
    pub with_target: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            ansi: false,
            with_target: true,
        }
    }
}
