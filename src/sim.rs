//! Simulated load target

use async_trait::async_trait;
use loadgen_core::{CallError, Caller, RawRequest, RawResponse, ResultCode};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Echo target with configurable latency and failure rate
#[derive(Debug)]
pub struct SimulatedCaller {
    latency: Duration,
    jitter: Duration,
    failure_rate: f64,
    sequence: AtomicU64,
}

impl SimulatedCaller {
    /// Create a target answering after `latency ± jitter`, failing with
    /// probability `failure_rate` (clamped to `0.0..=1.0`, NaN means never)
    pub fn new(latency: Duration, jitter: Duration, failure_rate: f64) -> Self {
        Self {
            latency,
            jitter,
            failure_rate: if failure_rate.is_nan() {
                0.0
            } else {
                failure_rate.clamp(0.0, 1.0)
            },
            sequence: AtomicU64::new(0),
        }
    }

    fn sample_latency(&self, rng: &mut impl Rng) -> Duration {
        if self.jitter.is_zero() {
            return self.latency;
        }
        let jitter = self.jitter.as_nanos() as i128;
        let offset = rng.gen_range(-jitter..=jitter);
        let nanos = (self.latency.as_nanos() as i128 + offset).max(0);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl Caller for SimulatedCaller {
    fn build_request(&self) -> RawRequest {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        RawRequest::new(format!("ping-{n}"))
    }

    async fn execute(
        &self,
        request: &RawRequest,
        timeout: Duration,
    ) -> Result<RawResponse, CallError> {
        let (delay, fail) = {
            let mut rng = rand::thread_rng();
            (self.sample_latency(&mut rng), rng.gen_bool(self.failure_rate))
        };

        if delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(CallError::Timeout(timeout));
        }
        tokio::time::sleep(delay).await;

        if fail {
            return Err(CallError::Transport("connection reset by peer".to_string()));
        }
        Ok(RawResponse::new(request.id, request.payload.clone()))
    }

    fn validate(&self, request: &RawRequest, response: &RawResponse) -> (ResultCode, String) {
        if response.payload == request.payload {
            (ResultCode::Success, "ok".to_string())
        } else {
            (
                ResultCode::ResponseError,
                format!(
                    "payload mismatch: sent {} bytes, got {} bytes",
                    request.payload.len(),
                    response.payload.len()
                ),
            )
        }
    }
}
