//! Builder pattern for Generator construction

use crate::config::{suggested_concurrency, GeneratorConfig};
use crate::error::{LoadError, LoadResult};
use crate::result::CallResult;
use crate::traits::Caller;

use super::executor::Generator;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Builder for creating Generator instances
///
/// Provides ergonomic construction with validation.
///
/// # Example
/// ```ignore
/// let (result_tx, mut result_rx) = ChannelConfig::default().result_channel();
/// let generator = GeneratorBuilder::new()
///     .caller(caller)
///     .call_timeout(Duration::from_millis(50))
///     .rate_per_second(100)
///     .run_duration(Duration::from_secs(10))
///     .result_tx(result_tx)
///     .build()?;
/// ```
#[derive(Default)]
pub struct GeneratorBuilder {
    caller: Option<Arc<dyn Caller>>,
    call_timeout: Option<Duration>,
    rate_per_second: u32,
    run_duration: Option<Duration>,
    concurrency: Option<u32>,
    result_tx: Option<mpsc::Sender<CallResult>>,
}

impl GeneratorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the caller
    pub fn caller(mut self, caller: Arc<dyn Caller>) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Set the per-call timeout
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Set the admission rate; 0 (the default) means unbounded
    pub fn rate_per_second(mut self, rate: u32) -> Self {
        self.rate_per_second = rate;
        self
    }

    /// Set how long the generator runs
    pub fn run_duration(mut self, duration: Duration) -> Self {
        self.run_duration = Some(duration);
        self
    }

    /// Set the concurrency level
    ///
    /// Optional with a bounded rate, where it defaults to
    /// `call_timeout / (1s / rate) + 1`.
    pub fn concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Set the result stream sender
    pub fn result_tx(mut self, tx: mpsc::Sender<CallResult>) -> Self {
        self.result_tx = Some(tx);
        self
    }

    /// Take every field from a config
    pub fn config(self, config: &GeneratorConfig) -> Self {
        self.call_timeout(config.call_timeout)
            .rate_per_second(config.rate_per_second)
            .run_duration(config.run_duration)
            .concurrency(config.concurrency)
    }

    /// Build the Generator
    ///
    /// # Errors
    /// Returns an error naming the first missing or invalid parameter.
    pub fn build(self) -> LoadResult<Generator> {
        let caller = self.caller.ok_or(LoadError::missing("caller"))?;
        let call_timeout = self
            .call_timeout
            .ok_or(LoadError::missing("call_timeout"))?;
        let run_duration = self
            .run_duration
            .ok_or(LoadError::missing("run_duration"))?;
        let result_tx = self.result_tx.ok_or(LoadError::missing("result_tx"))?;
        let concurrency = match self.concurrency {
            Some(concurrency) => concurrency,
            None => suggested_concurrency(call_timeout, self.rate_per_second)
                .ok_or(LoadError::missing("concurrency"))?,
        };

        let config = GeneratorConfig {
            call_timeout,
            rate_per_second: self.rate_per_second,
            run_duration,
            concurrency,
        };

        Generator::new(caller, config, result_tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{RawRequest, RawResponse, ResultCode};
    use crate::traits::CallError;
    use async_trait::async_trait;

    struct NoopCaller;

    #[async_trait]
    impl Caller for NoopCaller {
        fn build_request(&self) -> RawRequest {
            RawRequest::default()
        }

        async fn execute(
            &self,
            request: &RawRequest,
            _timeout: Duration,
        ) -> Result<RawResponse, CallError> {
            Ok(RawResponse::new(request.id, Vec::new()))
        }

        fn validate(&self, _request: &RawRequest, _response: &RawResponse) -> (ResultCode, String) {
            (ResultCode::Success, String::new())
        }
    }

    fn complete() -> (GeneratorBuilder, mpsc::Receiver<CallResult>) {
        let (tx, rx) = mpsc::channel(16);
        let builder = GeneratorBuilder::new()
            .caller(Arc::new(NoopCaller))
            .call_timeout(Duration::from_millis(100))
            .rate_per_second(10)
            .run_duration(Duration::from_secs(1))
            .result_tx(tx);
        (builder, rx)
    }

    #[test]
    fn test_builder_complete() {
        let (builder, _rx) = complete();
        let generator = builder.build().unwrap();
        // 100ms timeout at 10/s
        assert_eq!(generator.config().concurrency, 2);
        assert_eq!(generator.tickets().total(), 2);
    }

    #[test]
    fn test_builder_missing_caller() {
        let (tx, _rx) = mpsc::channel(1);
        let err = GeneratorBuilder::new()
            .call_timeout(Duration::from_millis(100))
            .run_duration(Duration::from_secs(1))
            .result_tx(tx)
            .build()
            .unwrap_err();

        assert_eq!(err, LoadError::MissingParameter("caller"));
    }

    #[test]
    fn test_builder_missing_result_tx() {
        let err = GeneratorBuilder::new()
            .caller(Arc::new(NoopCaller))
            .call_timeout(Duration::from_millis(100))
            .run_duration(Duration::from_secs(1))
            .concurrency(1)
            .build()
            .unwrap_err();

        assert_eq!(err, LoadError::MissingParameter("result_tx"));
    }

    #[test]
    fn test_builder_zero_timeout() {
        let (builder, _rx) = complete();
        let err = builder.call_timeout(Duration::ZERO).build().unwrap_err();
        assert_eq!(err.parameter(), Some("call_timeout"));
    }

    #[test]
    fn test_builder_zero_duration() {
        let (builder, _rx) = complete();
        let err = builder.run_duration(Duration::ZERO).build().unwrap_err();
        assert_eq!(err.parameter(), Some("run_duration"));
    }

    #[test]
    fn test_builder_unbounded_rate_needs_concurrency() {
        let (builder, _rx) = complete();
        let err = builder.rate_per_second(0).build().unwrap_err();
        assert_eq!(err, LoadError::MissingParameter("concurrency"));
    }

    #[test]
    fn test_builder_unbounded_rate_accepted() {
        let (builder, _rx) = complete();
        let generator = builder.rate_per_second(0).concurrency(4).build().unwrap();
        assert_eq!(generator.config().rate_per_second, 0);
        assert_eq!(generator.config().tick_interval(), None);
    }

    #[test]
    fn test_builder_from_config() {
        let config = GeneratorConfig::new(Duration::from_millis(20), 0, Duration::from_secs(2))
            .with_concurrency(3);
        let (tx, _rx) = mpsc::channel(1);
        let generator = GeneratorBuilder::new()
            .caller(Arc::new(NoopCaller))
            .config(&config)
            .result_tx(tx)
            .build()
            .unwrap();

        assert_eq!(generator.config(), &config);
    }
}
