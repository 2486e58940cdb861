//! Error types for loadgen-core

use thiserror::Error;

/// Core error type
///
/// Only construction and lifecycle plumbing can fail. Per-call failures are
/// never errors at this level; they travel as [`crate::ResultCode`] values on
/// the result stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// A ticket pool was requested with zero capacity
    #[error("invalid ticket pool capacity: {0}")]
    InvalidCapacity(u32),

    /// A required constructor parameter was not supplied
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    /// A constructor parameter was supplied with an unusable value
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The ticket pool was closed while a ticket was being taken
    #[error("ticket pool is closed")]
    PoolClosed,
}

impl LoadError {
    /// Missing required parameter
    pub fn missing(name: &'static str) -> Self {
        LoadError::MissingParameter(name)
    }

    /// Parameter present but invalid
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        LoadError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Name of the parameter this error refers to, if any
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            LoadError::MissingParameter(name) | LoadError::InvalidParameter { name, .. } => {
                Some(name)
            }
            LoadError::InvalidCapacity(_) => Some("concurrency"),
            LoadError::PoolClosed => None,
        }
    }
}

/// Result type alias
pub type LoadResult<T> = std::result::Result<T, LoadError>;
