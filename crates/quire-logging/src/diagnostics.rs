//! Installation of the crate's own `tracing` diagnostics
//!
//! The engine reports write failures, rotations and resolver panics through
//! `tracing`. Applications that already install a subscriber get those events
//! in their own pipeline; the rest can use [`DiagnosticsBuilder`].

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::DiagnosticsConfig;

/// Builder for a stderr `tracing` subscriber
pub struct DiagnosticsBuilder {
    config: DiagnosticsConfig,
}

impl DiagnosticsBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: DiagnosticsConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: DiagnosticsConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default level (RUST_LOG still takes precedence)
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Include ANSI colors
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.config.ansi = ansi;
        self
    }

    /// Install the subscriber globally
    ///
    /// Returns `false` when a global subscriber is already set, which is not
    /// an error: the existing subscriber keeps receiving the events.
    pub fn try_init(self) -> bool {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let console_layer = tracing_subscriber::fmt::layer()
            .with_ansi(self.config.ansi)
            .with_target(self.config.with_target)
            .with_writer(std::io::stderr);

        Registry::default()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .is_ok()
    }
}

impl Default for DiagnosticsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
