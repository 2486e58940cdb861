//! Rate ticks for the dispatch loop

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};

use crate::config::tick_interval;

/// Paces admissions at `rate_per_second` using governor's GCRA limiter
///
/// The quota replenishes one cell every `1s / rate_per_second` with a burst
/// of one. The initial cell is consumed on creation, so like a periodic
/// timer the first tick fires one interval after the ticker is created.
/// A rate of zero disables pacing.
pub struct RateTicker {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate_per_second: u32,
}

impl RateTicker {
    /// Create a ticker for the given rate
    ///
    /// # Examples
    /// ```
    /// use loadgen_core::generator::RateTicker;
    ///
    /// // One admission every 10ms
    /// let ticker = RateTicker::new(100);
    /// assert!(ticker.is_enabled());
    ///
    /// // Unbounded
    /// let unbounded = RateTicker::new(0);
    /// assert!(!unbounded.is_enabled());
    /// ```
    pub fn new(rate_per_second: u32) -> Self {
        let limiter = tick_interval(rate_per_second)
            .and_then(Quota::with_period)
            .map(RateLimiter::direct);

        if let Some(ref limiter) = limiter {
            let _ = limiter.check();
        }

        Self {
            limiter,
            rate_per_second,
        }
    }

    /// Wait for the next tick
    ///
    /// Returns immediately if pacing is disabled.
    pub async fn tick(&self) {
        if let Some(ref limiter) = self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Check if pacing is enabled
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}

impl std::fmt::Debug for RateTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateTicker")
            .field("rate_per_second", &self.rate_per_second)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_ticker_unbounded() {
        let ticker = RateTicker::new(0);
        assert!(!ticker.is_enabled());
        assert!(format!("{:?}", ticker).contains("rate_per_second: 0"));
    }

    #[tokio::test]
    async fn test_ticker_first_tick_is_one_interval_away() {
        let ticker = RateTicker::new(10); // 100ms interval
        assert!(ticker.is_enabled());
        let start = Instant::now();
        ticker.tick().await;
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_ticker_unbounded_tick_returns_immediately() {
        let ticker = RateTicker::new(0);
        let start = Instant::now();
        ticker.tick().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_ticker_spaces_ticks() {
        let ticker = RateTicker::new(50); // 20ms interval
        let start = Instant::now();
        for _ in 0..4 {
            ticker.tick().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(75));
    }

    #[test]
    fn test_ticker_debug() {
        let ticker = RateTicker::new(100);
        let debug = format!("{:?}", ticker);
        assert!(debug.contains("RateTicker"));
        assert!(debug.contains("100"));
        assert!(debug.contains("true"));
    }
}
