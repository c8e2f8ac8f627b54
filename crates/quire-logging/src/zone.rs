//! Time zones and clocks used for rendering timestamps

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, Utc};

/// Source of the current instant
///
/// Injectable so tests can pin or advance time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The wall clock
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Zone in which record timestamps are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogZone {
    /// The host's local zone, resolved per record
    #[default]
    Local,
    /// UTC, rendered as `+00:00`
    Utc,
    /// A fixed offset from UTC
    Fixed(FixedOffset),
}

impl LogZone {
    /// A fixed zone `seconds_east` of UTC, if the offset is in range
    pub fn fixed(seconds_east: i32) -> Option<Self> {
        FixedOffset::east_opt(seconds_east).map(LogZone::Fixed)
    }

    /// Express an instant in this zone
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            LogZone::Local => instant.with_timezone(&Local).fixed_offset(),
            LogZone::Utc => instant.fixed_offset(),
            LogZone::Fixed(offset) => instant.with_timezone(offset),
        }
    }
}

impl fmt::Display for LogZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogZone::Local => write!(f, "local"),
            LogZone::Utc => write!(f, "utc"),
            LogZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}
