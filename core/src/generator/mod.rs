//! Load generator: dispatch loop, call executors and shutdown
//!
//! The generator drives a [`crate::Caller`] with a simple loop:
//! **take ticket -> spawn call -> wait for rate tick -> repeat**.
//!
//! 1. The dispatch loop takes a ticket from the [`crate::TicketPool`], which
//!    stalls admission whenever `concurrency` calls are already in flight
//! 2. Each admitted call runs as its own tokio task: build request, execute
//!    with the call timeout, classify, publish the [`crate::CallResult`]
//! 3. The call returns its ticket on every exit path
//! 4. With a bounded rate, the loop waits for the next tick before admitting
//!    again
//!
//! A stop request (the run-duration timer or [`Generator::stop`]) halts
//! admission, marks the generator as shutting down, waits until every ticket
//! is back, then closes the result stream and records the call count.
//!
//! # Example
//!
//! ```ignore
//! use loadgen_core::{ChannelConfig, Generator};
//!
//! let (result_tx, mut result_rx) = ChannelConfig::default().result_channel();
//! let generator = Generator::builder()
//!     .caller(caller)
//!     .call_timeout(Duration::from_millis(50))
//!     .rate_per_second(100)
//!     .run_duration(Duration::from_secs(10))
//!     .result_tx(result_tx)
//!     .build()?;
//!
//! generator.start();
//! while let Some(result) = result_rx.recv().await {
//!     println!("{} {}", result.id, result.code);
//! }
//! ```

mod builder;
mod call;
mod executor;
mod rate_limiter;
mod status;

pub use builder::GeneratorBuilder;
pub use executor::Generator;
pub use rate_limiter::RateTicker;
pub use status::GenStatus;

#[cfg(test)]
mod tests;
