//! Log levels

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    /// Single-character code used in rendered lines
    pub fn as_char(self) -> char {
        match self {
            Level::Info => 'i',
            Level::Warn => 'w',
            Level::Error => 'e',
        }
    }

    /// Parse a rendered level code
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' => Some(Level::Info),
            'w' => Some(Level::Warn),
            'e' => Some(Level::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Warn => write!(f, "warn"),
            Level::Error => write!(f, "error"),
        }
    }
}
