//! Error types for loadgen-log

use thiserror::Error;

/// Log sink error type
#[derive(Error, Debug)]
pub enum LogError {
    /// No engine registered under this name
    #[error("unknown log engine {0:?}")]
    UnknownEngine(String),

    /// An engine with this name is already registered
    #[error("log engine {0:?} registered twice")]
    DuplicateEngine(String),

    /// An engine failed to initialise
    #[error("log engine {name:?} failed to initialise: {reason}")]
    Init {
        /// Engine name
        name: String,
        /// Failure reason
        reason: String,
    },

    /// No engine was configured for the sink
    #[error("no log engine configured")]
    NoEngine,

    /// Unrecognised level name
    #[error("unknown log level {0:?}")]
    UnknownLevel(String),

    /// IO error (writing a record, spawning the writer thread)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type LogResult<T> = std::result::Result<T, LogError>;
