//! Generator configuration types

use crate::error::{LoadError, LoadResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Generator configuration
///
/// Immutable once a generator has been built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Per-call timeout handed to the caller
    pub call_timeout: Duration,

    /// Admissions per second; 0 means unbounded
    pub rate_per_second: u32,

    /// How long the generator runs before stopping itself
    pub run_duration: Duration,

    /// Maximum number of calls in flight
    pub concurrency: u32,
}

impl GeneratorConfig {
    /// Create a config, deriving concurrency from the timeout and rate
    ///
    /// With an unbounded rate the derived concurrency is 1; use
    /// [`GeneratorConfig::with_concurrency`] to raise it.
    pub fn new(call_timeout: Duration, rate_per_second: u32, run_duration: Duration) -> Self {
        Self {
            call_timeout,
            rate_per_second,
            run_duration,
            concurrency: suggested_concurrency(call_timeout, rate_per_second).unwrap_or(1),
        }
    }

    /// Set the concurrency
    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Interval between rate ticks, `None` when the rate is unbounded
    pub fn tick_interval(&self) -> Option<Duration> {
        tick_interval(self.rate_per_second)
    }

    /// Validate the configuration
    ///
    /// A zero rate is valid and means unbounded.
    pub fn validate(&self) -> LoadResult<()> {
        if self.call_timeout.is_zero() {
            return Err(LoadError::invalid(
                "call_timeout",
                "must be greater than zero",
            ));
        }

        if self.run_duration.is_zero() {
            return Err(LoadError::invalid(
                "run_duration",
                "must be greater than zero",
            ));
        }

        if self.concurrency == 0 {
            return Err(LoadError::invalid("concurrency", "must be at least 1"));
        }

        Ok(())
    }
}

/// Interval between rate ticks: `1s / rate_per_second`
pub fn tick_interval(rate_per_second: u32) -> Option<Duration> {
    if rate_per_second == 0 {
        return None;
    }
    Some(Duration::from_nanos(
        (1_000_000_000 / u64::from(rate_per_second)).max(1),
    ))
}

/// Enough tickets to cover every call that can start within one timeout
///
/// `call_timeout / interval + 1`. `None` when the rate is unbounded, since
/// then only an explicit value makes sense.
pub fn suggested_concurrency(call_timeout: Duration, rate_per_second: u32) -> Option<u32> {
    if rate_per_second == 0 {
        return None;
    }
    let in_flight = call_timeout.as_nanos() * u128::from(rate_per_second) / NANOS_PER_SEC;
    Some(u32::try_from(in_flight).unwrap_or(u32::MAX - 1).saturating_add(1))
}
