//! Colourised stdout engine

use crate::engine::{LogEngine, LogRecord};
use crate::error::LogResult;
use crate::level::Level;

use std::io::{self, IsTerminal, Write};

const RESET: &str = "\x1b[0m";

/// ANSI colour for each level
fn brush(level: Level) -> &'static str {
    match level {
        Level::Trace => "\x1b[1;36m",   // cyan
        Level::Debug => "\x1b[1;34m",   // blue
        Level::Info => "\x1b[1;34m",    // blue
        Level::Warning => "\x1b[1;33m", // yellow
        Level::Error => "\x1b[1;31m",   // red
    }
}

/// Writes records to stdout as `YYYY/MM/DD HH:MM:SS [TAG] message`
///
/// Lines are coloured by level when stdout is a terminal.
#[derive(Debug, Clone)]
pub struct ConsoleEngine {
    min_level: Level,
    color: bool,
}

impl ConsoleEngine {
    /// Engine printing every level, coloured if stdout is a terminal
    pub fn new() -> Self {
        Self {
            min_level: Level::Trace,
            color: io::stdout().is_terminal(),
        }
    }

    /// Drop records below `level`
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Force colouring on or off
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Render a record the way it is printed, or `None` if it is filtered out
    pub fn format(&self, record: &LogRecord) -> Option<String> {
        if record.level < self.min_level {
            return None;
        }

        let stamp = record.timestamp.format("%Y/%m/%d %H:%M:%S");
        let line = record.line();
        Some(if self.color {
            format!("{stamp} {}{line}{RESET}", brush(record.level))
        } else {
            format!("{stamp} {line}")
        })
    }
}

impl Default for ConsoleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEngine for ConsoleEngine {
    fn write(&mut self, record: &LogRecord) -> LogResult<()> {
        if let Some(line) = self.format(record) {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{line}")?;
        }
        Ok(())
    }

    fn destroy(&mut self) {
        let _ = io::stdout().flush();
    }
}
