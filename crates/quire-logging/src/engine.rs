//! The log engine
//!
//! A [`LogEngine`] accepts records from any thread and hands them to a single
//! writer thread through a bounded queue. Producers block while the queue is
//! full; nothing is dropped. Records reach the file in the order their
//! enqueue completed, and `shutdown` returns only after everything enqueued
//! before it has been written.

use std::backtrace::Backtrace;
use std::error::Error;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, FixedOffset};
use crossbeam_channel::Sender;
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use quire_core::{Event, SubscriptionId, Topic};
use tracing::{error, info, trace, warn};

use crate::config::LogConfig;
use crate::error::LogError;
use crate::level::Level;
use crate::record::LogRecord;
use crate::resolver::LogFileResolver;
use crate::worker::{self, Command, FileSink, RotationTarget, Shared, Worker};
use crate::zone::{Clock, LogZone, system_clock};

/// Per-line filter; return `false` to drop the line
///
/// Called on the writer thread with the record's timestamp, level, tag and
/// the physical line about to be written.
pub type LogFilter = Arc<dyn Fn(&DateTime<FixedOffset>, Level, &str, &str) -> bool + Send + Sync>;

/// Name of the topic handed to resolvers for requesting rotation
pub const ROTATION_TOPIC: &str = "quire.log_file_change";

enum Destination {
    Fixed(PathBuf),
    Resolved(Arc<dyn LogFileResolver>),
}

struct Running {
    sender: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    rotation: Topic<PathBuf>,
    subscription: SubscriptionId,
}

impl Running {
    /// Drain the queue and join the writer
    fn stop(mut self) {
        // Drops the subscriber's sender
        self.rotation.unsubscribe(self.subscription);

        let own_writer = self
            .worker
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id());
        if own_writer {
            // The writer finishes the queue and exits once the senders are gone
            return;
        }

        if self.sender.send(Command::Shutdown).is_err() {
            warn!("Log writer exited before shutdown");
        }
        if let Some(handle) = self.worker.take()
            && handle.join().is_err()
        {
            error!("Log writer thread panicked");
        }
    }
}

enum Lifecycle {
    Closed,
    Open(Running),
    /// Shutdown has taken the running state and is draining it
    Draining,
}

struct EngineInner {
    destination: Destination,
    config: LogConfig,
    zone: LogZone,
    clock: Clock,
    shared: Arc<Shared>,
    /// Serializes startup and shutdown
    control: Mutex<()>,
    lifecycle: RwLock<Lifecycle>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Lifecycle::Open(running) = mem::replace(self.lifecycle.get_mut(), Lifecycle::Closed) {
            running.stop();
        }
    }
}

/// Builder for [`LogEngine`]
pub struct LogEngineBuilder {
    destination: Destination,
    config: LogConfig,
    zone: Option<LogZone>,
    clock: Option<Clock>,
    filter: Option<LogFilter>,
}

impl LogEngineBuilder {
    /// Write to a single fixed file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_destination(Destination::Fixed(path.into()))
    }

    /// Let a resolver choose the file and request rotations
    pub fn with_resolver(resolver: Arc<dyn LogFileResolver>) -> Self {
        Self::with_destination(Destination::Resolved(resolver))
    }

    fn with_destination(destination: Destination) -> Self {
        Self {
            destination,
            config: LogConfig::default(),
            zone: None,
            clock: None,
            filter: None,
        }
    }

    /// Use a specific configuration
    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Render timestamps in `zone`, overriding the resolver and config
    pub fn zone(mut self, zone: LogZone) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Take timestamps from `clock` instead of the system clock
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn filter(mut self, filter: LogFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn build(self) -> LogEngine {
        let zone = self.zone.unwrap_or_else(|| match &self.destination {
            Destination::Resolved(resolver) => resolver.zone(),
            Destination::Fixed(_) => self.config.zone.to_zone().unwrap_or_else(|err| {
                warn!(error = %err, "Falling back to local time");
                LogZone::Local
            }),
        });
        let initial_path = match &self.destination {
            Destination::Fixed(path) => path.clone(),
            Destination::Resolved(resolver) => resolver.current_file(),
        };

        LogEngine {
            inner: Arc::new(EngineInner {
                destination: self.destination,
                config: self.config,
                zone,
                clock: self.clock.unwrap_or_else(system_clock),
                shared: Arc::new(Shared::new(initial_path, self.filter)),
                control: Mutex::new(()),
                lifecycle: RwLock::new(Lifecycle::Closed),
            }),
        }
    }
}

/// Handle to a log engine
///
/// Cloning yields another handle to the same engine. Dropping the last
/// handle shuts the engine down.
#[derive(Clone)]
pub struct LogEngine {
    inner: Arc<EngineInner>,
}

impl LogEngine {
    /// An engine writing to `path` with default configuration
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LogEngineBuilder::new(path).build()
    }

    pub fn builder(path: impl Into<PathBuf>) -> LogEngineBuilder {
        LogEngineBuilder::new(path)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open the destination and start the writer
    ///
    /// Fails with [`LogError::AlreadyOpen`] on a running engine. An engine
    /// halted by a failed rotation is restarted from scratch. If the file
    /// cannot be opened the engine stays closed.
    pub fn startup(&self) -> Result<(), LogError> {
        let _control = self.control()?;

        match &*self.inner.lifecycle.read() {
            Lifecycle::Open(_) if !self.inner.shared.is_halted() => return Err(LogError::AlreadyOpen),
            Lifecycle::Draining => return Err(LogError::ShuttingDown),
            _ => {}
        }
        self.stop();

        let shared = &self.inner.shared;
        shared.pending_rotation.lock().take();

        let capacity = self.inner.config.queue_capacity.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);

        let rotation = Topic::new(ROTATION_TOPIC);
        let subscription = rotation.subscribe(rotation_handler(Arc::clone(shared), sender.clone()));

        let (path, resolver) = match &self.inner.destination {
            Destination::Fixed(path) => (path.clone(), None),
            Destination::Resolved(resolver) => {
                resolver.on_create(rotation.clone());
                (resolver.current_file(), Some(Arc::clone(resolver)))
            }
        };

        let sink = match FileSink::open(&path) {
            Ok(sink) => sink,
            Err(source) => {
                rotation.unsubscribe(subscription);
                return Err(LogError::Io { path, source });
            }
        };

        shared.halted.store(false, Ordering::Release);
        *shared.current_path.write() = path.clone();

        let worker = Worker {
            receiver,
            shared: Arc::clone(shared),
            resolver,
            fallback_path: path.clone(),
            zone: self.inner.zone,
            clock: Arc::clone(&self.inner.clock),
            sync_on_write: self.inner.config.sync_on_write,
            sink: Some(sink),
        };
        let handle = thread::Builder::new()
            .name(self.inner.config.worker_name.clone())
            .spawn(move || worker.run());
        let handle = match handle {
            Ok(handle) => handle,
            Err(err) => {
                rotation.unsubscribe(subscription);
                return Err(LogError::Worker(err));
            }
        };

        *self.inner.lifecycle.write() = Lifecycle::Open(Running {
            sender,
            worker: Some(handle),
            rotation,
            subscription,
        });

        info!(path = %path.display(), zone = %self.inner.zone, "Log engine started");
        Ok(())
    }

    /// Stop accepting records, write everything already queued, close the file
    ///
    /// No-op on a closed engine. Called from the writer thread itself (for
    /// example inside a filter) it returns without waiting for the drain.
    pub fn shutdown(&self) {
        if let Ok(_control) = self.control() {
            self.stop();
        }
    }

    /// Whether the caller is this engine's own writer thread
    fn on_own_writer(&self) -> bool {
        worker::is_writer_for(&self.inner.shared)
    }

    fn control(&self) -> Result<MutexGuard<'_, ()>, LogError> {
        if self.on_own_writer() {
            self.inner.control.try_lock().ok_or(LogError::ShuttingDown)
        } else {
            Ok(self.inner.control.lock())
        }
    }

    /// Requires the control lock
    fn stop(&self) {
        let running = {
            let mut lifecycle = self.inner.lifecycle.write();
            match mem::replace(&mut *lifecycle, Lifecycle::Draining) {
                Lifecycle::Open(running) => running,
                other => {
                    *lifecycle = other;
                    return;
                }
            }
        };

        // The lifecycle lock is released so late producers see Draining and return
        running.stop();
        *self.inner.lifecycle.write() = Lifecycle::Closed;
        info!(path = %self.path().display(), "Log engine stopped");
    }

    /// Read access that never blocks the writer thread
    fn lifecycle(&self) -> Option<RwLockReadGuard<'_, Lifecycle>> {
        if self.on_own_writer() {
            self.inner.lifecycle.try_read()
        } else {
            Some(self.inner.lifecycle.read())
        }
    }

    /// Whether records are currently accepted
    pub fn is_open(&self) -> bool {
        !self.inner.shared.is_halted()
            && self
                .lifecycle()
                .is_some_and(|lifecycle| matches!(*lifecycle, Lifecycle::Open(_)))
    }

    /// The file currently written to
    pub fn path(&self) -> PathBuf {
        self.inner.shared.current_path.read().clone()
    }

    pub fn zone(&self) -> LogZone {
        self.inner.zone
    }

    pub fn config(&self) -> &LogConfig {
        &self.inner.config
    }

    /// Topic that switches the destination while running
    ///
    /// Fire it with a path to write there from the next record on, or with
    /// no payload to ask the resolver again. `None` while closed.
    pub fn rotation_topic(&self) -> Option<Topic<PathBuf>> {
        match &*self.lifecycle()? {
            Lifecycle::Open(running) => Some(running.rotation.clone()),
            _ => None,
        }
    }

    /// Replace the line filter; `None` removes it
    pub fn set_filter(&self, filter: Option<LogFilter>) {
        *self.inner.shared.filter.write() = filter;
    }

    // ========================================================================
    // Producers
    // ========================================================================

    /// Queue a record; never fails
    ///
    /// Does nothing on a closed or halted engine. Blocks while the queue is
    /// full. Records logged from this engine's own writer thread are dropped
    /// if they would have to wait.
    pub fn submit(&self, record: LogRecord) {
        if record.is_empty() || self.inner.shared.is_halted() {
            return;
        }

        let on_writer = self.on_own_writer();
        // The guard is released before sending so shutdown never waits on a full queue
        let sender = {
            let Some(lifecycle) = self.lifecycle() else {
                return;
            };
            let Lifecycle::Open(running) = &*lifecycle else {
                return;
            };
            running.sender.clone()
        };

        let command = Command::Record(record);
        if on_writer {
            if sender.try_send(command).is_err() {
                trace!("Dropped record logged from the writer thread");
            }
        } else if sender.send(command).is_err() {
            trace!("Log writer is gone, record dropped");
        }
    }

    pub fn log(&self, level: Level, tag: &str, message: impl Into<String>) {
        self.submit(LogRecord::new(level, tag, message));
    }

    /// Log an error and its cause chain
    pub fn log_error(&self, level: Level, tag: &str, error: &(dyn Error + 'static)) {
        self.submit(self.traced(LogRecord::from_error(level, tag, error)));
    }

    /// Log an optional message followed by an error chain, as one record
    pub fn log_with(&self, level: Level, tag: &str, message: Option<&str>, error: &(dyn Error + 'static)) {
        let record = match message {
            Some(message) => LogRecord::new(level, tag, message).with_cause(error),
            None => LogRecord::from_error(level, tag, error),
        };
        self.submit(self.traced(record));
    }

    fn traced(&self, record: LogRecord) -> LogRecord {
        if self.inner.config.capture_backtraces {
            record.with_backtrace(&Backtrace::capture())
        } else {
            record
        }
    }

    pub fn info(&self, tag: &str, message: impl Into<String>) {
        self.log(Level::Info, tag, message);
    }

    pub fn warn(&self, tag: &str, message: impl Into<String>) {
        self.log(Level::Warn, tag, message);
    }

    pub fn error(&self, tag: &str, message: impl Into<String>) {
        self.log(Level::Error, tag, message);
    }

    pub fn info_with(&self, tag: &str, message: Option<&str>, error: &(dyn Error + 'static)) {
        self.log_with(Level::Info, tag, message, error);
    }

    pub fn warn_with(&self, tag: &str, message: Option<&str>, error: &(dyn Error + 'static)) {
        self.log_with(Level::Warn, tag, message, error);
    }

    pub fn error_with(&self, tag: &str, message: Option<&str>, error: &(dyn Error + 'static)) {
        self.log_with(Level::Error, tag, message, error);
    }
}

impl std::fmt::Debug for LogEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogEngine")
            .field("path", &self.path())
            .field("zone", &self.inner.zone)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Queues the request behind earlier records, or on the writer thread
/// leaves it for the record being written
fn rotation_handler(shared: Arc<Shared>, sender: Sender<Command>) -> impl Fn(&Event<PathBuf>) + Send + Sync + 'static {
    move |event: &Event<PathBuf>| {
        let target = match event.payload() {
            Some(path) => RotationTarget::Path(path.clone()),
            None => RotationTarget::Current,
        };
        if worker::is_writer_for(&shared) {
            *shared.pending_rotation.lock() = Some(target);
        } else if sender.send(Command::Rotate(target)).is_err() {
            trace!("Log writer is gone, rotation dropped");
        }
    }
}
