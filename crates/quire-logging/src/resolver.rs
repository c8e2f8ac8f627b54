//! Log file resolvers
//!
//! A resolver decides which file the engine writes to and may switch files
//! while the engine runs by firing the rotation topic it receives in
//! [`LogFileResolver::on_create`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use quire_core::Topic;
use tracing::debug;

use crate::config::{FileConfig, RotationStrategy};
use crate::zone::{Clock, LogZone, system_clock};

/// Chooses the log destination for an engine
///
/// `on_log` runs on the writer thread immediately before each record is
/// written, so a rotation fired from it applies to that record.
pub trait LogFileResolver: Send + Sync {
    /// Called once per engine startup with the topic used to request rotation
    ///
    /// Firing the topic with a path switches to that file; firing it with no
    /// payload re-reads [`current_file`](Self::current_file).
    fn on_create(&self, rotation: Topic<PathBuf>) {
        let _ = rotation;
    }

    /// Called on the writer thread before each record
    fn on_log(&self) {}

    /// The file records should currently go to
    fn current_file(&self) -> PathBuf;

    /// Zone used to render timestamps
    fn zone(&self) -> LogZone {
        LogZone::Local
    }
}

/// Always writes to the same file
#[derive(Debug, Clone)]
pub struct FixedFileResolver {
    path: PathBuf,
    zone: LogZone,
}

impl FixedFileResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            zone: LogZone::Local,
        }
    }

    pub fn with_zone(mut self, zone: LogZone) -> Self {
        self.zone = zone;
        self
    }
}

impl LogFileResolver for FixedFileResolver {
    fn current_file(&self) -> PathBuf {
        self.path.clone()
    }

    fn zone(&self) -> LogZone {
        self.zone
    }
}

struct RollingState {
    rotation: Option<Topic<PathBuf>>,
    current: PathBuf,
}

/// Switches files on day or hour boundaries
///
/// Files are named `prefix.YYYY-MM-DD` (daily) or `prefix.YYYY-MM-DD-HH`
/// (hourly) in the zone the resolver renders timestamps in.
pub struct RollingFileResolver {
    directory: PathBuf,
    prefix: String,
    strategy: RotationStrategy,
    zone: LogZone,
    clock: Clock,
    state: Mutex<RollingState>,
}

impl RollingFileResolver {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>, strategy: RotationStrategy) -> Self {
        let mut resolver = Self {
            directory: directory.into(),
            prefix: prefix.into(),
            strategy,
            zone: LogZone::Local,
            clock: system_clock(),
            state: Mutex::new(RollingState {
                rotation: None,
                current: PathBuf::new(),
            }),
        };
        resolver.reset_current();
        resolver
    }

    pub fn from_config(config: &FileConfig, zone: LogZone) -> Self {
        Self::new(config.directory.clone(), config.prefix.clone(), config.rotation).with_zone(zone)
    }

    pub fn with_zone(mut self, zone: LogZone) -> Self {
        self.zone = zone;
        self.reset_current();
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self.reset_current();
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The file that holds records written at `instant`
    pub fn file_for(&self, instant: DateTime<Utc>) -> PathBuf {
        let local = self.zone.localize(instant);
        let name = match self.strategy {
            RotationStrategy::Daily => format!("{}.{}", self.prefix, local.format("%Y-%m-%d")),
            RotationStrategy::Hourly => format!("{}.{}", self.prefix, local.format("%Y-%m-%d-%H")),
            RotationStrategy::Never => self.prefix.clone(),
        };
        self.directory.join(name)
    }

    fn reset_current(&mut self) {
        let current = self.file_for((self.clock)());
        self.state.get_mut().current = current;
    }
}

impl LogFileResolver for RollingFileResolver {
    fn on_create(&self, rotation: Topic<PathBuf>) {
        let current = self.file_for((self.clock)());
        let mut state = self.state.lock();
        state.rotation = Some(rotation);
        state.current = current;
    }

    fn on_log(&self) {
        let next = self.file_for((self.clock)());
        let rotation = {
            let mut state = self.state.lock();
            if state.current == next {
                return;
            }
            state.current = next.clone();
            state.rotation.clone()
        };

        if let Some(rotation) = rotation {
            debug!(file = %next.display(), "Rolling to next log file");
            rotation.fire(next);
        }
    }

    fn current_file(&self) -> PathBuf {
        self.state.lock().current.clone()
    }

    fn zone(&self) -> LogZone {
        self.zone
    }
}

impl std::fmt::Debug for RollingFileResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingFileResolver")
            .field("directory", &self.directory)
            .field("prefix", &self.prefix)
            .field("strategy", &self.strategy)
            .field("zone", &self.zone)
            .finish_non_exhaustive()
    }
}
