//! loadgen-core: concurrency core of the load generator
//!
//! This crate drives a target with calls at a bounded rate and concurrency,
//! classifies every outcome and streams the results out, including:
//!
//! - The ticket pool bounding in-flight calls
//! - The generator: dispatch loop, call executors, lifecycle and shutdown
//! - Result types and the fixed result-code ordinals
//! - The `Caller` trait implemented by load targets
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod error;
pub mod generator;
pub mod result;
pub mod tickets;
pub mod traits;

pub use channel::ChannelConfig;
pub use config::GeneratorConfig;
pub use error::*;
pub use generator::{GenStatus, Generator, GeneratorBuilder};
pub use result::*;
pub use tickets::{Ticket, TicketPool};
pub use traits::*;
