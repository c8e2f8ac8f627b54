//! # Quire Storage
//!
//! Crash-safe persistence of small structured payloads (configuration, state
//! snapshots) in a single logical file.
//!
//! ## Features
//!
//! - **Rename-aside writes**: the current version becomes `P.old` before the
//!   new one is written, so a crash mid-write never loses the last good copy
//! - **Fallback reads**: an unreadable `P` is quarantined as `P.corrupted` and
//!   `P.old` is used instead
//! - **Explicit outcomes**: reads return [`ReadOutcome`], writes return
//!   `Result`, deletes return whether every removal succeeded
//! - **Injectable reporting**: every recovery step is described by a
//!   [`StoreIncident`] sent to an [`IncidentReporter`] (`tracing` by default)
//!
//! ## Example
//!
//! ```rust,no_run
//! use quire_storage::DurableFile;
//!
//! let file = DurableFile::new("/var/lib/app/settings.json");
//! file.write_utf8("{\"retries\":3}").unwrap();
//!
//! match file.read_utf8().into_option() {
//!     Some(text) => println!("loaded {text}"),
//!     None => println!("first run"),
//! }
//! ```

pub mod codec;
pub mod durable;
pub mod error;
pub mod incident;

// Re-exports
pub use durable::{DurableFile, ReadOutcome};
pub use error::StorageError;
pub use incident::{IncidentLog, IncidentReporter, StoreIncident, TracingReporter};
