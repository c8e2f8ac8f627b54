//! Incident reporting for durable files
//!
//! Durable file operations never panic and rarely fail outright. Anything that
//! went wrong along the way (a failed rename, an unreadable primary file, a
//! quarantine) is described by a [`StoreIncident`] and handed to the file's
//! [`IncidentReporter`].

use std::fmt;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::{info, warn};

/// Something noteworthy that happened during a durable file operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreIncident {
    /// Moving the current file aside before a write failed; the write went ahead
    RenameAsideFailed {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
    /// Writing the new version failed
    WriteFailed { path: PathBuf, error: String },
    /// A file existed but could not be read or decoded
    ReadFailed { path: PathBuf, error: String },
    /// An unreadable primary file was moved to the quarantine slot
    Quarantined { path: PathBuf, quarantine: PathBuf },
    /// Moving an unreadable primary file to the quarantine slot failed
    QuarantineFailed {
        path: PathBuf,
        quarantine: PathBuf,
        error: String,
    },
    /// Falling back to the previous version
    FallbackAttempt { path: PathBuf },
    /// Removing a file during delete failed
    DeleteFailed { path: PathBuf, error: String },
}

impl StoreIncident {
    /// Whether this incident means data could not be read or written
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            StoreIncident::Quarantined { .. } | StoreIncident::FallbackAttempt { .. }
        )
    }
}

impl fmt::Display for StoreIncident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreIncident::RenameAsideFailed { from, to, error } => write!(
                f,
                "failed to rename {} to {}: {}",
                from.display(),
                to.display(),
                error
            ),
            StoreIncident::WriteFailed { path, error } => {
                write!(f, "failed to write {}: {}", path.display(), error)
            }
            StoreIncident::ReadFailed { path, error } => {
                write!(f, "failed to read {}: {}", path.display(), error)
            }
            StoreIncident::Quarantined { path, quarantine } => write!(
                f,
                "corrupted file {} moved to {}",
                path.display(),
                quarantine.display()
            ),
            StoreIncident::QuarantineFailed {
                path,
                quarantine,
                error,
            } => write!(
                f,
                "failed to move corrupted file {} to {}: {}",
                path.display(),
                quarantine.display(),
                error
            ),
            StoreIncident::FallbackAttempt { path } => {
                write!(f, "attempting to read {}", path.display())
            }
            StoreIncident::DeleteFailed { path, error } => {
                write!(f, "failed to delete {}: {}", path.display(), error)
            }
        }
    }
}

/// Sink for [`StoreIncident`]s
pub trait IncidentReporter: Send + Sync {
    /// Handle one incident
    fn report(&self, incident: &StoreIncident);
}

impl<F> IncidentReporter for F
where
    F: Fn(&StoreIncident) + Send + Sync,
{
    fn report(&self, incident: &StoreIncident) {
        self(incident)
    }
}

/// Default reporter: emits incidents as `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl IncidentReporter for TracingReporter {
    fn report(&self, incident: &StoreIncident) {
        if incident.is_failure() {
            warn!(incident = %incident, "Durable file incident");
        } else {
            info!(incident = %incident, "Durable file recovery");
        }
    }
}

/// Reporter that keeps every incident in memory
///
/// Handy for callers that want to surface recovery details after the fact.
#[derive(Debug, Default)]
pub struct IncidentLog {
    incidents: Mutex<Vec<StoreIncident>>,
}

impl IncidentLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all incidents recorded so far
    pub fn incidents(&self) -> Vec<StoreIncident> {
        self.incidents.lock().clone()
    }

    /// Remove and return all recorded incidents
    pub fn take(&self) -> Vec<StoreIncident> {
        std::mem::take(&mut *self.incidents.lock())
    }

    /// Number of recorded incidents
    pub fn len(&self) -> usize {
        self.incidents.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IncidentReporter for IncidentLog {
    fn report(&self, incident: &StoreIncident) {
        self.incidents.lock().push(incident.clone());
    }
}
