//! Logger levels accepted by SiteWhere microservices

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Logging level applied to a logger override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoggingLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Off,
}

impl LoggingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggingLevel::Debug => "debug",
            LoggingLevel::Info => "info",
            LoggingLevel::Warn => "warn",
            LoggingLevel::Error => "error",
            LoggingLevel::Fatal => "fatal",
            LoggingLevel::Off => "off",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            LoggingLevel::Debug,
            LoggingLevel::Info,
            LoggingLevel::Warn,
            LoggingLevel::Error,
            LoggingLevel::Fatal,
            LoggingLevel::Off,
        ]
    }
}

impl fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggingLevel {
    type Err = Error;

    /// Case-insensitive parse
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        LoggingLevel::all()
            .iter()
            .copied()
            .find(|level| level.as_str() == lower)
            .ok_or_else(|| {
                Error::bad_input(format!(
                    "unknown logging level '{}', expected one of: debug, info, warn, error, fatal, off",
                    s
                ))
            })
    }
}
