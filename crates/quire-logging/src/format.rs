//! Rendering of log lines
//!
//! Every physical line has the shape
//!
//! ```text
//! <timestamp>  <c>  <tag> \t<text>
//! ```
//!
//! where `<timestamp>` is ISO-8601 with millisecond precision and a
//! `+HH:MM` offset, and `<c>` is the level code (`i`, `w` or `e`).

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;

use chrono::{DateTime, FixedOffset};

use crate::level::Level;

/// strftime pattern for the timestamp column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Prefix for each entry of a rendered error chain after the first
pub const CAUSE_PREFIX: &str = "Caused by: ";

/// Line preceding a rendered backtrace
pub const BACKTRACE_HEADER: &str = "Stack backtrace:";

/// Render the timestamp column
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Render one physical line, including the trailing newline
pub fn render_line(timestamp: &str, level: Level, tag: &str, text: &str) -> String {
    format!("{timestamp}  {}  {tag} \t{text}\n", level.as_char())
}

/// Split text into the physical lines that get written
///
/// Empty lines are dropped.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|line| !line.is_empty())
}

/// Render an error and its `source()` chain, one entry per line
pub fn render_error(err: &(dyn Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push('\n');
        rendered.push_str(CAUSE_PREFIX);
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Render a backtrace under its header; `None` unless frames were captured
pub fn render_backtrace(backtrace: &Backtrace) -> Option<String> {
    (backtrace.status() == BacktraceStatus::Captured).then(|| format!("{BACKTRACE_HEADER}\n{backtrace}"))
}
