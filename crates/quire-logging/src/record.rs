//! Queued log records

use std::backtrace::Backtrace;
use std::error::Error;

use crate::format::{render_backtrace, render_error, split_lines};
use crate::level::Level;

/// A single logging call, as queued for the writer
///
/// The cause is rendered on the calling thread so the record owns nothing
/// borrowed from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    level: Level,
    tag: String,
    message: Option<String>,
    cause: Option<String>,
}

impl LogRecord {
    /// A record carrying only a message
    pub fn new(level: Level, tag: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            tag: sanitize_tag(tag),
            message: Some(message.into()),
            cause: None,
        }
    }

    /// A record carrying only an error chain
    pub fn from_error(level: Level, tag: &str, error: &(dyn Error + 'static)) -> Self {
        Self {
            level,
            tag: sanitize_tag(tag),
            message: None,
            cause: Some(render_error(error)),
        }
    }

    /// Attach an error chain, rendered after the message
    pub fn with_cause(mut self, error: &(dyn Error + 'static)) -> Self {
        self.cause = Some(render_error(error));
        self
    }

    /// Append a backtrace below the error chain
    ///
    /// A backtrace that was not captured leaves the record unchanged.
    pub fn with_backtrace(mut self, backtrace: &Backtrace) -> Self {
        if let Some(rendered) = render_backtrace(backtrace) {
            let cause = self.cause.get_or_insert_with(String::new);
            if !cause.is_empty() {
                cause.push('\n');
            }
            cause.push_str(&rendered);
        }
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// Physical lines to write: message lines, then cause lines
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.message
            .as_deref()
            .into_iter()
            .chain(self.cause.as_deref())
            .flat_map(split_lines)
    }

    /// Whether the record would produce no output
    pub fn is_empty(&self) -> bool {
        self.lines().next().is_none()
    }
}

/// Tags are single-line by construction
fn sanitize_tag(tag: &str) -> String {
    if tag.contains(['\n', '\r']) {
        tag.replace(['\n', '\r'], " ")
    } else {
        tag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_message_then_cause_lines() {
        let cause = io::Error::new(io::ErrorKind::NotFound, "missing peer");
        let record = LogRecord::new(Level::Warn, "SYNC", "retrying\nin 5s").with_cause(&cause);

        let lines: Vec<_> = record.lines().collect();
        assert_eq!(lines, vec!["retrying", "in 5s", "missing peer"]);
    }

    #[test]
    fn test_empty_message_is_empty() {
        assert!(LogRecord::new(Level::Info, "T", "").is_empty());
        assert!(LogRecord::new(Level::Info, "T", "\n\n").is_empty());
        assert!(!LogRecord::new(Level::Info, "T", "x").is_empty());
    }

    #[test]
    fn test_error_only_record() {
        let cause = io::Error::other("disk full");
        let record = LogRecord::from_error(Level::Error, "IO", &cause);
        assert_eq!(record.message(), None);
        assert_eq!(record.cause(), Some("disk full"));
    }

    #[test]
    fn test_backtrace_follows_error_chain() {
        let cause = io::Error::other("disk full");
        let record = LogRecord::new(Level::Error, "IO", "flush failed")
            .with_cause(&cause)
            .with_backtrace(&Backtrace::force_capture());

        let lines: Vec<_> = record.lines().collect();
        assert_eq!(&lines[..3], &["flush failed", "disk full", "Stack backtrace:"]);
        assert!(lines.len() > 3);
    }

    #[test]
    fn test_disabled_backtrace_is_ignored() {
        let cause = io::Error::other("disk full");
        let record = LogRecord::from_error(Level::Error, "IO", &cause);
        assert_eq!(record.clone().with_backtrace(&Backtrace::disabled()), record);
    }

    #[test]
    fn test_tag_is_single_line() {
        let record = LogRecord::new(Level::Info, "A\nB", "x");
        assert_eq!(record.tag(), "A B");
    }
}
