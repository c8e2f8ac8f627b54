//! Parsing of rendered log lines
//!
//! The inverse of [`render_line`](crate::format::render_line). Lines that do
//! not match the layout are skipped rather than reported.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::level::Level;

/// One parsed physical line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedLine {
    /// The timestamp column exactly as written
    pub timestamp: String,
    /// The parsed timestamp, keeping its offset
    pub date_time: DateTime<FixedOffset>,
    pub level: Level,
    pub tag: String,
    pub message: String,
}

/// Parse every well-formed line of a log, skipping the rest
pub fn parse(log: &str) -> Vec<ParsedLine> {
    log.split('\n').filter_map(parse_line).collect()
}

/// Parse one line; `None` when it does not match the layout
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let (timestamp, rest) = line.split_once("  ")?;
    let date_time = DateTime::parse_from_rfc3339(timestamp).ok()?;

    let mut chars = rest.chars();
    let level = Level::from_char(chars.next()?)?;
    if chars.next()? != ' ' || chars.next()? != ' ' {
        return None;
    }

    // The level code and both spaces are ASCII
    let (tag, message) = rest[3..].split_once(" \t")?;

    Some(ParsedLine {
        timestamp: timestamp.to_string(),
        date_time,
        level,
        tag: tag.to_string(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let line = parse_line("2017-04-20T16:28:06.492+08:00  e  LED \tLauncher process seems dead.").unwrap();

        assert_eq!(line.timestamp, "2017-04-20T16:28:06.492+08:00");
        assert_eq!(line.level, Level::Error);
        assert_eq!(line.tag, "LED");
        assert_eq!(line.message, "Launcher process seems dead.");
        assert_eq!(line.date_time.offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let log = "2017-04-20T16:28:06.492+08:00  e  LED \tLauncher process seems dead.\n\
                   2017-04-20T16:28:06.498+08:00  i  Cleaner \tNo old data to clear.\n\
                   \n\
                   bad line\n\
                   2017-04-20T16:28:06.724+08:00  w  SocketIO \tStatus approved. Start working...\n";

        let lines = parse(log);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].level, Level::Error);
        assert_eq!(lines[1].level, Level::Info);
        assert_eq!(lines[2].level, Level::Warn);
        assert_eq!(lines[2].tag, "SocketIO");
    }

    #[test]
    fn test_rejects_bad_columns() {
        // unknown level
        assert!(parse_line("2017-04-20T16:28:06.492+08:00  x  LED \tmsg").is_none());
        // single space after level
        assert!(parse_line("2017-04-20T16:28:06.492+08:00  i LED \tmsg").is_none());
        // no tag separator
        assert!(parse_line("2017-04-20T16:28:06.492+08:00  i  LED msg").is_none());
        // bad timestamp
        assert!(parse_line("yesterday  i  LED \tmsg").is_none());
        // truncated after the timestamp
        assert!(parse_line("2017-04-20T16:28:06.492+08:00  i").is_none());
    }

    #[test]
    fn test_message_keeps_tabs_and_spaces() {
        let line = parse_line("2020-01-01T00:00:00.000Z  i  T \ta \tb  c").unwrap();
        assert_eq!(line.tag, "T");
        assert_eq!(line.message, "a \tb  c");
    }
}
