//! The writer thread
//!
//! Exactly one writer exists per running engine. It owns the open file and
//! is the only place lines are rendered, filtered and written, so the order
//! records leave the queue is the order they reach the file.

use std::cell::Cell;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, FixedOffset};
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use quire_core::panic_message;
use tracing::{debug, error, info, warn};

use crate::engine::LogFilter;
use crate::format::{format_timestamp, render_line};
use crate::level::Level;
use crate::record::LogRecord;
use crate::resolver::LogFileResolver;
use crate::zone::{Clock, LogZone};

thread_local! {
    /// State of the engine whose writer runs on this thread, if any
    static WRITER_OF: Cell<*const Shared> = const { Cell::new(ptr::null()) };
}

/// Whether the calling thread is the writer of the engine owning `shared`
///
/// A writer calling into another engine is an ordinary producer there.
pub(crate) fn is_writer_for(shared: &Arc<Shared>) -> bool {
    WRITER_OF.with(|owner| ptr::eq(owner.get(), Arc::as_ptr(shared)))
}

/// Messages sent from producers to the writer
pub(crate) enum Command {
    Record(LogRecord),
    /// Rotation requested off the writer thread, ordered with the records
    Rotate(RotationTarget),
    Shutdown,
}

/// Destination requested through the rotation topic
#[derive(Debug)]
pub(crate) enum RotationTarget {
    Path(PathBuf),
    /// Ask the resolver again
    Current,
}

/// State shared by engine handles, the rotation subscriber and the writer
pub(crate) struct Shared {
    pub(crate) filter: RwLock<Option<LogFilter>>,
    /// Set when a rotation could not open its file; cleared by startup
    pub(crate) halted: AtomicBool,
    /// Rotation requested on the writer thread, applied before the record
    /// being written; newer requests replace older ones
    pub(crate) pending_rotation: Mutex<Option<RotationTarget>>,
    pub(crate) current_path: RwLock<PathBuf>,
}

impl Shared {
    pub(crate) fn new(initial_path: PathBuf, filter: Option<LogFilter>) -> Self {
        Self {
            filter: RwLock::new(filter),
            halted: AtomicBool::new(false),
            pending_rotation: Mutex::new(None),
            current_path: RwLock::new(initial_path),
        }
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }
}

/// An open log file
pub(crate) struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open `path` for appending, creating missing parent directories
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    fn commit(&mut self, sync: bool) -> io::Result<()> {
        self.writer.flush()?;
        if sync {
            self.writer.get_ref().sync_data()?;
        }
        Ok(())
    }
}

pub(crate) struct Worker {
    pub(crate) receiver: Receiver<Command>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) resolver: Option<Arc<dyn LogFileResolver>>,
    /// Destination when no resolver is available to ask
    pub(crate) fallback_path: PathBuf,
    pub(crate) zone: LogZone,
    pub(crate) clock: Clock,
    pub(crate) sync_on_write: bool,
    pub(crate) sink: Option<FileSink>,
}

impl Worker {
    pub(crate) fn run(mut self) {
        WRITER_OF.with(|owner| owner.set(Arc::as_ptr(&self.shared)));
        debug!(path = %self.fallback_path.display(), "Log writer started");

        // Ends on Shutdown, or once every sender is gone and the queue is empty
        while let Ok(command) = self.receiver.recv() {
            match command {
                Command::Record(record) => self.write_record(&record),
                Command::Rotate(target) => self.rotate(target),
                Command::Shutdown => {
                    // Records that raced the request are still written
                    let receiver = self.receiver.clone();
                    for command in receiver.try_iter() {
                        if let Command::Record(record) = command {
                            self.write_record(&record);
                        }
                    }
                    break;
                }
            }
        }

        self.close();
        debug!("Log writer stopped");
    }

    fn write_record(&mut self, record: &LogRecord) {
        if self.shared.is_halted() {
            return;
        }

        if let Some(resolver) = &self.resolver
            && let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| resolver.on_log()))
        {
            warn!(panic = %panic_message(&*payload), "Log file resolver panicked in on_log");
        }
        self.apply_pending_rotation();

        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        let timestamp = self.zone.localize((self.clock)());
        let rendered_timestamp = format_timestamp(&timestamp);
        let filter = self.shared.filter.read().clone();

        let mut written = false;
        for line in record.lines() {
            if let Some(filter) = &filter
                && !accepts(filter, &timestamp, record, line)
            {
                continue;
            }

            let rendered = render_line(&rendered_timestamp, record.level(), record.tag(), line);
            mirror(record.level(), &rendered);
            if let Err(err) = sink.writer.write_all(rendered.as_bytes()) {
                warn!(path = %sink.path.display(), error = %err, "Failed to write log line");
            }
            written = true;
        }

        if written && let Err(err) = sink.commit(self.sync_on_write) {
            warn!(path = %sink.path.display(), error = %err, "Failed to flush log file");
        }
    }

    fn apply_pending_rotation(&mut self) {
        let pending = self.shared.pending_rotation.lock().take();
        if let Some(target) = pending {
            self.rotate(target);
        }
    }

    fn rotate(&mut self, target: RotationTarget) {
        if self.shared.is_halted() {
            return;
        }

        let path = match target {
            RotationTarget::Path(path) => path,
            RotationTarget::Current => self.resolved_path(),
        };
        if self.sink.as_ref().is_some_and(|sink| sink.path == path) {
            debug!(path = %path.display(), "Rotation target is the current file");
            return;
        }

        let previous = self.close();
        match FileSink::open(&path) {
            Ok(sink) => {
                info!(from = ?previous, to = %path.display(), "Rotated log file");
                *self.shared.current_path.write() = path;
                self.sink = Some(sink);
            }
            Err(err) => {
                error!(
                    path = %path.display(),
                    error = %err,
                    "Failed to open rotated log file, logging halted until restart"
                );
                self.shared.halted.store(true, Ordering::Release);
            }
        }
    }

    fn resolved_path(&self) -> PathBuf {
        let Some(resolver) = &self.resolver else {
            return self.fallback_path.clone();
        };
        panic::catch_unwind(AssertUnwindSafe(|| resolver.current_file())).unwrap_or_else(|payload| {
            warn!(panic = %panic_message(&*payload), "Log file resolver panicked in current_file");
            self.fallback_path.clone()
        })
    }

    /// Flush and close the open file, returning its path
    fn close(&mut self) -> Option<PathBuf> {
        let mut sink = self.sink.take()?;
        if let Err(err) = sink.commit(self.sync_on_write) {
            warn!(path = %sink.path.display(), error = %err, "Failed to flush log file on close");
        }
        Some(sink.path)
    }
}

/// Run the filter; a panicking filter keeps the line
fn accepts(filter: &LogFilter, timestamp: &DateTime<FixedOffset>, record: &LogRecord, line: &str) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| filter(timestamp, record.level(), record.tag(), line))) {
        Ok(keep) => keep,
        Err(payload) => {
            warn!(panic = %panic_message(&*payload), "Log filter panicked");
            true
        }
    }
}

/// Echo a rendered line: errors to stderr, everything else to stdout
fn mirror(level: Level, line: &str) {
    let _ = if level == Level::Error {
        io::stderr().lock().write_all(line.as_bytes())
    } else {
        io::stdout().lock().write_all(line.as_bytes())
    };
}
