//! Log engines and the name -> factory registry

use crate::console::ConsoleEngine;
use crate::error::{LogError, LogResult};
use crate::level::Level;

use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One formatted log line on its way to the engines
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Severity
    pub level: Level,

    /// Module path or target of the event
    pub target: String,

    /// Rendered message, including structured fields
    pub message: String,

    /// `file:line` of the call site, when tracking is enabled
    pub location: Option<String>,

    /// When the event was recorded
    pub timestamp: DateTime<Local>,
}

impl LogRecord {
    /// Create a record stamped with the current time
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            target: target.into(),
            message: message.into(),
            location: None,
            timestamp: Local::now(),
        }
    }

    /// `[TAG] [file:line] message`
    pub fn line(&self) -> String {
        match &self.location {
            Some(location) => format!("[{}] [{}] {}", self.level.tag(), location, self.message),
            None => format!("[{}] {}", self.level.tag(), self.message),
        }
    }
}

/// An output backend for log records
///
/// Engines are driven from a single writer thread, so they need `Send` but
/// not `Sync`.
pub trait LogEngine: Send {
    /// Prepare the engine before its first write
    fn init(&mut self) -> LogResult<()> {
        Ok(())
    }

    /// Write one record
    fn write(&mut self, record: &LogRecord) -> LogResult<()>;

    /// Release resources once no more records will arrive
    fn destroy(&mut self) {}
}

/// Constructor for an engine
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn LogEngine> + Send + Sync>;

/// Name -> factory table
///
/// Populated once at process start; engines are created by name when the
/// sink is built.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    factories: BTreeMap<String, EngineFactory>,
}

impl EngineRegistry {
    /// Name of the built-in stdout engine
    pub const CONSOLE: &'static str = "console";

    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in engines
    ///
    /// The console engine drops records below `console_level`.
    pub fn with_builtin(console_level: Level) -> Self {
        let mut registry = Self::new();
        let console: EngineFactory = Arc::new(move || -> Box<dyn LogEngine> {
            Box::new(ConsoleEngine::new().with_min_level(console_level))
        });
        registry.factories.insert(Self::CONSOLE.to_string(), console);
        registry
    }

    /// Register an engine factory under `name`
    ///
    /// # Errors
    /// Returns [`LogError::DuplicateEngine`] if the name is taken.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> LogResult<()>
    where
        F: Fn() -> Box<dyn LogEngine> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(LogError::DuplicateEngine(name));
        }
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Create and initialise the engine registered under `name`
    ///
    /// # Errors
    /// [`LogError::UnknownEngine`] for an unregistered name,
    /// [`LogError::Init`] when the engine fails to initialise.
    pub fn create(&self, name: &str) -> LogResult<Box<dyn LogEngine>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| LogError::UnknownEngine(name.to_string()))?;

        let mut engine = factory();
        engine.init().map_err(|e| LogError::Init {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(engine)
    }

    /// Check whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
