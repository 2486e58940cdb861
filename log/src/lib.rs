//! loadgen-log: asynchronous pluggable log sink
//!
//! Plugs into `tracing` as a [`tracing_subscriber::Layer`]. Records are
//! queued and written by a background thread to one or more named engines
//! looked up in an [`EngineRegistry`].
//!
//! ```ignore
//! use loadgen_log::{AsyncLogBuilder, EngineRegistry, Level};
//! use tracing_subscriber::prelude::*;
//!
//! let (layer, _guard) = AsyncLogBuilder::new(EngineRegistry::with_builtin(Level::Info))
//!     .engine(EngineRegistry::CONSOLE)
//!     .build()?;
//! tracing_subscriber::registry().with(layer).init();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod console;
pub mod engine;
pub mod error;
pub mod layer;
pub mod level;

pub use console::ConsoleEngine;
pub use engine::{EngineFactory, EngineRegistry, LogEngine, LogRecord};
pub use error::{LogError, LogResult};
pub use layer::{AsyncLogBuilder, AsyncLogLayer, LogGuard};
pub use level::Level;
