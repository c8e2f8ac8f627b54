//! # Quire Logging
//!
//! Line-oriented application logging with a single writer thread.
//!
//! ## Features
//!
//! - **Ordered writes**: records from any number of threads are written in
//!   the order their enqueue completed, by one writer per engine
//! - **Back-pressure**: the queue is bounded and producers wait instead of
//!   losing records
//! - **Live rotation**: a [`LogFileResolver`] can switch files between two
//!   records through a [`quire_core::Topic`]
//! - **Readable format**: `<timestamp>  <c>  <tag> \t<text>` lines that
//!   [`parser`] reads back
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quire_logging::{LogConfig, LogContext, RollingFileResolver, RotationStrategy};
//!
//! let context = LogContext::new(LogConfig::default());
//! let resolver = RollingFileResolver::new("/var/log/app", "app", RotationStrategy::Daily);
//! context.initialize(Arc::new(resolver)).unwrap();
//!
//! context.info("Launcher", "Started");
//! context.teardown();
//! ```

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod format;
pub mod level;
pub mod parser;
pub mod record;
pub mod resolver;
pub mod zone;

mod worker;

pub use config::{DiagnosticsConfig, FileConfig, LogConfig, RotationStrategy, ZoneConfig};
pub use context::LogContext;
pub use diagnostics::DiagnosticsBuilder;
pub use engine::{LogEngine, LogEngineBuilder, LogFilter, ROTATION_TOPIC};
pub use error::LogError;
pub use level::Level;
pub use parser::{ParsedLine, parse, parse_line};
pub use record::LogRecord;
pub use resolver::{FixedFileResolver, LogFileResolver, RollingFileResolver};
pub use zone::{Clock, LogZone, system_clock};
