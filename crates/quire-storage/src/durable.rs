//! Rename-aside durable files
//!
//! A [`DurableFile`] manages up to three files derived from one logical path
//! `P`:
//!
//! ```text
//! P            current version
//! P.old        previous version, fallback when P is missing or unreadable
//! P.corrupted  last unreadable P, kept for inspection
//! ```
//!
//! Writes move `P` to `P.old` before writing the new version, so a crash in
//! the middle of a write leaves `P.old` intact. Reads try `P`, quarantine it if
//! it cannot be decoded, then fall back to `P.old`. Recovery works from file
//! existence alone; there is no metadata file.
//!
//! `DurableFile` does no locking. Callers that access the same logical path
//! from several threads or processes must serialize those accesses.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::StorageError;
use crate::incident::{IncidentReporter, StoreIncident, TracingReporter};

const OLD_SUFFIX: &str = ".old";
const CORRUPTED_SUFFIX: &str = ".corrupted";

/// Result of reading a durable file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    /// Decoded from the current version
    Primary(T),
    /// Decoded from the previous version because the current one was missing
    /// or unreadable
    Fallback(T),
    /// Neither version exists or could be decoded
    Absent,
}

impl<T> ReadOutcome<T> {
    /// The decoded value, wherever it came from
    pub fn into_option(self) -> Option<T> {
        match self {
            ReadOutcome::Primary(value) | ReadOutcome::Fallback(value) => Some(value),
            ReadOutcome::Absent => None,
        }
    }

    /// Borrow the decoded value
    pub fn value(&self) -> Option<&T> {
        match self {
            ReadOutcome::Primary(value) | ReadOutcome::Fallback(value) => Some(value),
            ReadOutcome::Absent => None,
        }
    }

    /// Whether nothing could be read
    pub fn is_absent(&self) -> bool {
        matches!(self, ReadOutcome::Absent)
    }

    /// Whether the value came from the previous version
    pub fn is_fallback(&self) -> bool {
        matches!(self, ReadOutcome::Fallback(_))
    }

    /// Map the decoded value, keeping where it came from
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ReadOutcome<U> {
        match self {
            ReadOutcome::Primary(value) => ReadOutcome::Primary(f(value)),
            ReadOutcome::Fallback(value) => ReadOutcome::Fallback(f(value)),
            ReadOutcome::Absent => ReadOutcome::Absent,
        }
    }
}

/// A logical file persisted with rename-aside writes and fallback reads
#[derive(Clone)]
pub struct DurableFile {
    path: PathBuf,
    old_path: PathBuf,
    corrupted_path: PathBuf,
    reporter: Arc<dyn IncidentReporter>,
    sync_on_write: bool,
}

impl DurableFile {
    /// Create a handle for the logical path `path`
    ///
    /// Nothing is touched on disk until an operation is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            old_path: sibling(&path, OLD_SUFFIX),
            corrupted_path: sibling(&path, CORRUPTED_SUFFIX),
            path,
            reporter: Arc::new(TracingReporter),
            sync_on_write: true,
        }
    }

    /// Send incidents to `reporter` instead of `tracing`
    pub fn with_reporter(mut self, reporter: Arc<dyn IncidentReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Whether to fsync the new version before a write returns (default: true)
    pub fn with_sync(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }

    /// Path of the current version
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the previous version
    pub fn old_path(&self) -> &Path {
        &self.old_path
    }

    /// Path of the quarantined version
    pub fn corrupted_path(&self) -> &Path {
        &self.corrupted_path
    }

    /// Replace the stored payload with `bytes`
    pub fn write(&self, bytes: &[u8]) -> Result<(), StorageError> {
        self.write_with(|w| w.write_all(bytes))
    }

    /// Replace the stored payload with whatever `write` produces
    ///
    /// The current version is moved to the `.old` slot first. If that move
    /// fails it is reported and the write still goes ahead. On success the
    /// new payload is fully written (and synced, unless disabled) before this
    /// returns.
    #[instrument(skip(self, write), fields(path = %self.path.display()))]
    pub fn write_with<F>(&self, write: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        self.rename_aside();

        match self.write_new_version(write) {
            Ok(()) => {
                debug!("Wrote new version");
                Ok(())
            }
            Err(err) => {
                self.reporter.report(&StoreIncident::WriteFailed {
                    path: self.path.clone(),
                    error: err.to_string(),
                });
                Err(StorageError::io_at(&self.path, &err))
            }
        }
    }

    fn rename_aside(&self) {
        if !self.path.exists() {
            return;
        }
        if let Err(err) = fs::rename(&self.path, &self.old_path) {
            self.reporter.report(&StoreIncident::RenameAsideFailed {
                from: self.path.clone(),
                to: self.old_path.clone(),
                error: err.to_string(),
            });
        }
    }

    fn write_new_version<F>(&self, write: F) -> io::Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        write(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;

        if self.sync_on_write {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Read the raw stored bytes
    pub fn read(&self) -> ReadOutcome<Vec<u8>> {
        self.read_with(|bytes| Ok::<_, std::convert::Infallible>(bytes.to_vec()))
    }

    /// Read and decode the stored payload
    ///
    /// 1. If the current version exists and decodes, return it.
    /// 2. If it exists but cannot be read or decoded, move it to the
    ///    `.corrupted` slot (replacing any earlier quarantine) and continue.
    /// 3. If the previous version exists and decodes, return it. A previous
    ///    version that fails to decode is reported but left in place.
    /// 4. Otherwise the payload is absent.
    #[instrument(skip(self, decode), fields(path = %self.path.display()))]
    pub fn read_with<T, E, F>(&self, decode: F) -> ReadOutcome<T>
    where
        E: fmt::Display,
        F: Fn(&[u8]) -> Result<T, E>,
    {
        if self.path.exists() {
            match load(&self.path, &decode) {
                Ok(value) => return ReadOutcome::Primary(value),
                Err(error) => {
                    self.reporter.report(&StoreIncident::ReadFailed {
                        path: self.path.clone(),
                        error,
                    });
                    self.quarantine();
                }
            }
        }

        if self.old_path.exists() {
            self.reporter.report(&StoreIncident::FallbackAttempt {
                path: self.old_path.clone(),
            });
            match load(&self.old_path, &decode) {
                Ok(value) => return ReadOutcome::Fallback(value),
                Err(error) => {
                    self.reporter.report(&StoreIncident::ReadFailed {
                        path: self.old_path.clone(),
                        error,
                    });
                }
            }
        }

        ReadOutcome::Absent
    }

    fn quarantine(&self) {
        match fs::rename(&self.path, &self.corrupted_path) {
            Ok(()) => self.reporter.report(&StoreIncident::Quarantined {
                path: self.path.clone(),
                quarantine: self.corrupted_path.clone(),
            }),
            Err(err) => self.reporter.report(&StoreIncident::QuarantineFailed {
                path: self.path.clone(),
                quarantine: self.corrupted_path.clone(),
                error: err.to_string(),
            }),
        }
    }

    /// Whether the current or the previous version exists
    pub fn exists(&self) -> bool {
        self.path.exists() || self.old_path.exists()
    }

    /// Remove the current and the previous version
    ///
    /// Both removals are attempted even if the first fails. Returns `false`
    /// if any removal failed. The quarantine file is left alone.
    pub fn delete(&self) -> bool {
        let old_removed = self.remove_if_present(&self.old_path);
        let current_removed = self.remove_if_present(&self.path);
        old_removed && current_removed
    }

    fn remove_if_present(&self, path: &Path) -> bool {
        if !path.exists() {
            return true;
        }
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(err) => {
                self.reporter.report(&StoreIncident::DeleteFailed {
                    path: path.to_path_buf(),
                    error: err.to_string(),
                });
                false
            }
        }
    }
}

impl fmt::Debug for DurableFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurableFile")
            .field("path", &self.path)
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}

/// `path` with `suffix` appended to its file name
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn load<T, E, F>(path: &Path, decode: &F) -> Result<T, String>
where
    E: fmt::Display,
    F: Fn(&[u8]) -> Result<T, E>,
{
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    decode(&bytes).map_err(|e| e.to_string())
}
