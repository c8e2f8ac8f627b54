//! Application-scoped logging context
//!
//! [`LogContext`] owns at most one running [`LogEngine`] and forwards the
//! convenience calls to it. Construct one at startup and pass it (or an
//! `Arc` of it) to the components that log.

use std::error::Error;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::LogConfig;
use crate::diagnostics::DiagnosticsBuilder;
use crate::engine::{LogEngine, LogEngineBuilder, LogFilter};
use crate::error::LogError;
use crate::resolver::{LogFileResolver, RollingFileResolver};

/// Holds the active engine, if any
///
/// Every logging method is a no-op until [`initialize`](Self::initialize)
/// succeeds and after [`teardown`](Self::teardown).
pub struct LogContext {
    config: LogConfig,
    filter: Mutex<Option<LogFilter>>,
    active: Mutex<Option<LogEngine>>,
}

impl LogContext {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            filter: Mutex::new(None),
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Start an engine driven by `resolver`, replacing any active one
    ///
    /// The previous engine is drained and closed first. On failure the
    /// context is left inactive.
    pub fn initialize(&self, resolver: Arc<dyn LogFileResolver>) -> Result<LogEngine, LogError> {
        self.config.validate()?;
        self.teardown();

        let mut builder = LogEngineBuilder::with_resolver(resolver).config(self.config.clone());
        if let Some(filter) = self.filter.lock().clone() {
            builder = builder.filter(filter);
        }
        let engine = builder.build();
        engine.startup()?;

        // A concurrent initialize may have won the race; keep the newest
        let displaced = self.active.lock().replace(engine.clone());
        if let Some(displaced) = displaced {
            displaced.shutdown();
        }

        debug!(path = %engine.path().display(), "Log context initialized");
        Ok(engine)
    }

    /// Start an engine from the configured rolling file output
    ///
    /// Also installs the configured diagnostics subscriber unless the
    /// process already has one.
    pub fn initialize_from_config(&self) -> Result<LogEngine, LogError> {
        self.install_diagnostics();
        let file = self
            .config
            .file
            .as_ref()
            .ok_or_else(|| LogError::config("no file output configured"))?;
        let resolver = RollingFileResolver::from_config(file, self.config.zone.to_zone()?);
        self.initialize(Arc::new(resolver))
    }

    /// Install the stderr `tracing` subscriber described by `config.diagnostics`
    ///
    /// Returns `false` if a global subscriber was already set.
    pub fn install_diagnostics(&self) -> bool {
        DiagnosticsBuilder::new()
            .with_config(self.config.diagnostics.clone())
            .try_init()
    }

    /// Drain and close the active engine, if any
    pub fn teardown(&self) {
        // Taken out first so loggers never wait on the drain
        let previous = self.active.lock().take();
        if let Some(engine) = previous {
            engine.shutdown();
            debug!("Log context torn down");
        }
    }

    pub fn engine(&self) -> Option<LogEngine> {
        self.active.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.engine().is_some_and(|engine| engine.is_open())
    }

    /// Install a filter on the active engine and on every later one
    pub fn set_filter(&self, filter: Option<LogFilter>) {
        *self.filter.lock() = filter.clone();
        if let Some(engine) = self.engine() {
            engine.set_filter(filter);
        }
    }

    pub fn info(&self, tag: &str, message: impl Into<String>) {
        if let Some(engine) = self.engine() {
            engine.info(tag, message);
        }
    }

    pub fn warn(&self, tag: &str, message: impl Into<String>) {
        if let Some(engine) = self.engine() {
            engine.warn(tag, message);
        }
    }

    pub fn error(&self, tag: &str, message: impl Into<String>) {
        if let Some(engine) = self.engine() {
            engine.error(tag, message);
        }
    }

    pub fn info_with(&self, tag: &str, message: Option<&str>, error: &(dyn Error + 'static)) {
        if let Some(engine) = self.engine() {
            engine.info_with(tag, message, error);
        }
    }

    pub fn warn_with(&self, tag: &str, message: Option<&str>, error: &(dyn Error + 'static)) {
        if let Some(engine) = self.engine() {
            engine.warn_with(tag, message, error);
        }
    }

    pub fn error_with(&self, tag: &str, message: Option<&str>, error: &(dyn Error + 'static)) {
        if let Some(engine) = self.engine() {
            engine.error_with(tag, message, error);
        }
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        self.teardown();
    }
}
