//! Log levels

use crate::error::LogError;
use std::fmt;
use std::str::FromStr;

/// Severity of a log record, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Fine-grained tracing
    Trace,
    /// Debugging detail
    Debug,
    /// Normal operation
    Info,
    /// Something unexpected, operation continues
    Warning,
    /// Operation failed
    Error,
}

impl Level {
    /// Four-letter tag printed in front of each message
    pub fn tag(&self) -> &'static str {
        match self {
            Level::Trace => "TRAC",
            Level::Debug => "DEBU",
            Level::Info => "INFO",
            Level::Warning => "WARN",
            Level::Error => "ERRO",
        }
    }

    /// Directive accepted by `tracing_subscriber::EnvFilter`
    pub fn directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warning,
            _ => Level::Error,
        }
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" | "trac" => Ok(Level::Trace),
            "debug" | "debu" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warning),
            "error" | "erro" => Ok(Level::Error),
            _ => Err(LogError::UnknownLevel(s.to_string())),
        }
    }
}
