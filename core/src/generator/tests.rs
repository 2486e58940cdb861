//! Integration tests for the Generator module

use super::*;
use crate::error::LoadError;
use crate::result::{CallResult, RawRequest, RawResponse, ResultCode};
use crate::traits::{CallError, Caller};
use crate::GeneratorConfig;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

// ============================================================================
// Mock Caller
// ============================================================================

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    TimeOut,
    Panic,
}

struct MockCaller {
    delay: Duration,
    behavior: Behavior,
    executed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockCaller {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            behavior: Behavior::Succeed,
            executed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Caller for MockCaller {
    fn build_request(&self) -> RawRequest {
        RawRequest::new("ping")
    }

    async fn execute(
        &self,
        request: &RawRequest,
        timeout: Duration,
    ) -> Result<RawResponse, CallError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.executed.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::Succeed => Ok(RawResponse::new(request.id, "pong")),
            Behavior::TimeOut => Err(CallError::Timeout(timeout)),
            Behavior::Panic => panic!("target exploded"),
        }
    }

    fn validate(&self, _request: &RawRequest, response: &RawResponse) -> (ResultCode, String) {
        if response.payload == b"pong" {
            (ResultCode::Success, "ok".to_string())
        } else {
            (ResultCode::ResponseError, "unexpected payload".to_string())
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn create_test_generator(
    caller: Arc<MockCaller>,
    config: GeneratorConfig,
) -> (Generator, mpsc::Receiver<CallResult>) {
    let (result_tx, result_rx) = mpsc::channel(1000);
    let generator = Generator::new(caller, config, result_tx).expect("Failed to build generator");
    (generator, result_rx)
}

async fn drain(mut result_rx: mpsc::Receiver<CallResult>) -> Vec<CallResult> {
    let mut results = Vec::new();
    while let Some(result) = result_rx.recv().await {
        results.push(result);
    }
    results
}

fn unbounded(concurrency: u32, call_timeout: Duration, run_duration: Duration) -> GeneratorConfig {
    GeneratorConfig::new(call_timeout, 0, run_duration).with_concurrency(concurrency)
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unbounded_rate_single_ticket() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(10)));
    let (generator, result_rx) = create_test_generator(
        Arc::clone(&caller),
        unbounded(1, Duration::from_secs(1), Duration::from_millis(100)),
    );

    let drain_handle = tokio::spawn(drain(result_rx));
    assert!(generator.start());
    generator.stopped().await;

    let results = drain_handle.await.expect("drain task panicked");
    let count = generator.call_count();

    assert!((5..=11).contains(&count), "admitted {count} calls");
    assert_eq!(caller.executed() as u64, count);
    // The call in flight when the timer fired is discarded
    assert!(results.len() as u64 >= count - 1);
    assert!(results.len() as u64 <= count);
    assert!(results.iter().all(|r| r.code == ResultCode::Success));
    assert_eq!(caller.max_in_flight(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rate_limited_admissions() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(5)));
    let config = GeneratorConfig::new(Duration::from_millis(100), 5, Duration::from_secs(1))
        .with_concurrency(10);
    let (generator, result_rx) = create_test_generator(Arc::clone(&caller), config);

    let drain_handle = tokio::spawn(drain(result_rx));
    generator.start();
    generator.stopped().await;
    drain_handle.await.expect("drain task panicked");

    let count = generator.call_count();
    assert!((4..=6).contains(&count), "admitted {count} calls");
    assert!(caller.max_in_flight() <= 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_never_exceeds_tickets() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(30)));
    let (generator, result_rx) = create_test_generator(
        Arc::clone(&caller),
        unbounded(3, Duration::from_secs(1), Duration::from_millis(200)),
    );

    let drain_handle = tokio::spawn(drain(result_rx));
    generator.start();
    generator.stopped().await;
    drain_handle.await.expect("drain task panicked");

    assert_eq!(caller.max_in_flight(), 3);
    assert!(generator.call_count() > 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unbounded_throughput_scales_with_concurrency() {
    let run = |concurrency| async move {
        let caller = Arc::new(MockCaller::new(Duration::from_millis(20)));
        let (generator, result_rx) = create_test_generator(
            caller,
            unbounded(concurrency, Duration::from_secs(1), Duration::from_millis(200)),
        );
        let drain_handle = tokio::spawn(drain(result_rx));
        generator.start();
        generator.stopped().await;
        drain_handle.await.expect("drain task panicked");
        generator.call_count()
    };

    let single = run(1).await;
    let quad = run(4).await;
    assert!(quad >= single * 2, "single={single} quad={quad}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timeouts_release_tickets() {
    let caller = Arc::new(
        MockCaller::new(Duration::from_millis(20)).with_behavior(Behavior::TimeOut),
    );
    let (generator, result_rx) = create_test_generator(
        Arc::clone(&caller),
        unbounded(2, Duration::from_millis(10), Duration::from_millis(200)),
    );

    let drain_handle = tokio::spawn(drain(result_rx));
    generator.start();
    generator.stopped().await;
    let results = drain_handle.await.expect("drain task panicked");

    // More calls than tickets means every ticket came back each time
    assert!(generator.call_count() > 2);
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.code == ResultCode::TimeoutWarning));
    assert_eq!(generator.tickets().remainder(), generator.tickets().total());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_waits_for_in_flight_calls() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(100)));
    let (generator, mut result_rx) = create_test_generator(
        Arc::clone(&caller),
        unbounded(3, Duration::from_secs(1), Duration::from_secs(10)),
    );

    generator.start();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let start = Instant::now();
    let (count, stopped) = generator.stop().await;

    assert!(stopped);
    assert_eq!(count, 3);
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(caller.executed(), 3);
    assert_eq!(generator.status(), GenStatus::Stopped);
    assert_eq!(generator.tickets().remainder(), generator.tickets().total());
    assert!(!generator.tickets().active());

    // In-flight results were discarded and the stream is closed
    assert!(result_rx.recv().await.is_none());

    assert_eq!(generator.stop().await, (0, false));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_results_after_stop() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(5)));
    let (generator, mut result_rx) = create_test_generator(
        Arc::clone(&caller),
        unbounded(4, Duration::from_secs(1), Duration::from_secs(10)),
    );

    generator.start();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let (count, stopped) = generator.stop().await;
    assert!(stopped);

    let mut received = 0u64;
    while let Some(result) = result_rx.recv().await {
        assert!(result.id >= 1 && result.id as u64 <= count);
        received += 1;
    }

    assert!(received > 0);
    assert!(received <= count);
    assert_eq!(caller.executed() as u64, count);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_with_full_result_stream() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(1)));
    let (result_tx, mut result_rx) = mpsc::channel(2);
    let generator = Generator::new(
        Arc::clone(&caller) as Arc<dyn Caller>,
        unbounded(4, Duration::from_secs(1), Duration::from_secs(10)),
        result_tx,
    )
    .expect("Failed to build generator");

    // Nobody drains the stream, so calls park on a full buffer
    generator.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (count, stopped) = tokio::time::timeout(Duration::from_secs(2), generator.stop())
        .await
        .expect("stop should not wait on a full result stream");

    assert!(stopped);
    assert!(count >= 2, "admitted {count} calls");
    assert_eq!(generator.status(), GenStatus::Stopped);
    assert_eq!(generator.tickets().in_use(), 0);

    let mut received = 0;
    while result_rx.recv().await.is_some() {
        received += 1;
    }
    assert_eq!(received, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ids_strictly_increase() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(1)));
    let (generator, result_rx) = create_test_generator(
        caller,
        unbounded(1, Duration::from_secs(1), Duration::from_millis(50)),
    );

    let drain_handle = tokio::spawn(drain(result_rx));
    generator.start();
    generator.stopped().await;
    let results = drain_handle.await.expect("drain task panicked");

    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids: {ids:?}");
    assert!(results.iter().all(|r| r.request.id == r.id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_caller_reports_fatal_error() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(5)).with_behavior(Behavior::Panic));
    let (generator, result_rx) = create_test_generator(
        Arc::clone(&caller),
        unbounded(2, Duration::from_secs(1), Duration::from_millis(100)),
    );

    let drain_handle = tokio::spawn(drain(result_rx));
    generator.start();
    generator.stopped().await;
    let results = drain_handle.await.expect("drain task panicked");

    assert!(generator.call_count() > 2);
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.code == ResultCode::FatalError));
    assert!(results[0].message.contains("target exploded"));
    assert_eq!(generator.tickets().remainder(), 2);
}

#[tokio::test]
async fn test_stop_before_start() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(1)));
    let (generator, _result_rx) = create_test_generator(
        caller,
        unbounded(1, Duration::from_secs(1), Duration::from_secs(1)),
    );

    assert_eq!(generator.status(), GenStatus::Original);
    assert_eq!(generator.stop().await, (0, false));
    assert_eq!(generator.status(), GenStatus::Original);
}

#[tokio::test]
async fn test_start_twice_is_noop() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(1)));
    let (generator, result_rx) = create_test_generator(
        caller,
        unbounded(1, Duration::from_secs(1), Duration::from_secs(10)),
    );
    let drain_handle = tokio::spawn(drain(result_rx));

    assert!(generator.start());
    assert!(!generator.start());
    assert_eq!(generator.status(), GenStatus::Started);

    let (_, stopped) = generator.stop().await;
    assert!(stopped);
    assert!(!generator.start());
    assert_eq!(generator.status(), GenStatus::Stopped);
    drain_handle.await.expect("drain task panicked");
}

#[test]
fn test_start_outside_runtime_keeps_generator_startable() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(1)));
    let (generator, result_rx) = create_test_generator(
        caller,
        unbounded(1, Duration::from_secs(1), Duration::from_millis(30)),
    );

    assert!(!generator.start());
    assert_eq!(generator.status(), GenStatus::Original);

    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    runtime.block_on(async {
        let drain_handle = tokio::spawn(drain(result_rx));
        assert!(generator.start());
        generator.stopped().await;
        drain_handle.await.expect("drain task panicked");
    });
    assert_eq!(generator.status(), GenStatus::Stopped);
    assert!(generator.call_count() > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stops_report_once() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(20)));
    let (generator, _result_rx) = create_test_generator(
        caller,
        unbounded(2, Duration::from_secs(1), Duration::from_secs(10)),
    );

    generator.start();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (a, b) = tokio::join!(generator.stop(), generator.stop());
    assert_eq!([a.1, b.1].iter().filter(|s| **s).count(), 1);
    assert_eq!(generator.status(), GenStatus::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timer_stop_then_explicit_stop() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(1)));
    let (generator, result_rx) = create_test_generator(
        caller,
        unbounded(1, Duration::from_secs(1), Duration::from_millis(30)),
    );

    let drain_handle = tokio::spawn(drain(result_rx));
    generator.start();
    generator.stopped().await;
    drain_handle.await.expect("drain task panicked");

    assert!(generator.call_count() > 0);
    assert_eq!(generator.stop().await, (0, false));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dropped_receiver_does_not_block_shutdown() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(2)));
    let (generator, result_rx) = create_test_generator(
        caller,
        unbounded(2, Duration::from_secs(1), Duration::from_millis(50)),
    );
    drop(result_rx);

    generator.start();
    tokio::time::timeout(Duration::from_secs(2), generator.stopped())
        .await
        .expect("generator should stop");
    assert!(generator.call_count() > 0);
}

#[test]
fn test_invalid_parameters_rejected() {
    let caller = Arc::new(MockCaller::new(Duration::from_millis(1)));
    let (result_tx, _result_rx) = mpsc::channel(1);

    let err = Generator::new(
        caller.clone(),
        unbounded(1, Duration::ZERO, Duration::from_secs(1)),
        result_tx.clone(),
    )
    .unwrap_err();
    assert_eq!(err.parameter(), Some("call_timeout"));

    let err = Generator::new(
        caller.clone(),
        unbounded(1, Duration::from_secs(1), Duration::ZERO),
        result_tx.clone(),
    )
    .unwrap_err();
    assert_eq!(err.parameter(), Some("run_duration"));

    let err = Generator::new(
        caller,
        unbounded(0, Duration::from_secs(1), Duration::from_secs(1)),
        result_tx,
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::InvalidParameter { name: "concurrency", .. }));
}
