//! Per-call unit of work: build, execute, classify, publish, release

use crate::result::{CallResult, RawRequest, RawResponse, ResultCode};
use crate::tickets::Ticket;
use crate::traits::Caller;

use super::executor::{stop_requested, Shared};

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// One admitted call
///
/// Owns the ticket it was admitted with and returns it when [`Call::run`]
/// finishes, whatever the outcome.
pub(crate) struct Call {
    pub(crate) id: i64,
    pub(crate) caller: Arc<dyn Caller>,
    pub(crate) call_timeout: Duration,
    pub(crate) shared: Arc<Shared>,
    pub(crate) result_tx: mpsc::Sender<CallResult>,
    pub(crate) ticket: Ticket,
}

impl Call {
    /// Run the call to completion
    pub(crate) async fn run(self) {
        let Call {
            id,
            caller,
            call_timeout,
            shared,
            result_tx,
            ticket,
        } = self;

        let result = execute_call(id, caller.as_ref(), call_timeout).await;

        tracing::trace!(
            call_id = id,
            code = result.code.code(),
            elapsed_us = result.elapsed.as_micros() as u64,
            "Call finished"
        );

        // The stream is only finalized after every ticket is back, so a send
        // attempted here can never race the close. A send parked on a full
        // stream gives way to a stop request.
        if shared.shutting_down.load(Ordering::SeqCst) {
            tracing::trace!(call_id = id, "Shutting down, result discarded");
        } else {
            let mut stop_rx = shared.stop_rx();
            tokio::select! {
                biased;

                _ = stop_requested(&mut stop_rx) => {
                    tracing::trace!(call_id = id, "Stop requested, result discarded");
                }
                sent = result_tx.send(result) => {
                    if sent.is_err() {
                        tracing::debug!(call_id = id, "Result receiver dropped, result discarded");
                    }
                }
            }
        }

        drop(result_tx);
        ticket.release();
    }
}

/// Outcome of the call protocol before it is stamped into a [`CallResult`]
struct Outcome {
    request: RawRequest,
    response: Option<RawResponse>,
    code: ResultCode,
    message: String,
    elapsed: Duration,
}

/// Build, execute and classify one call
///
/// Panics raised by the caller are contained and reported as
/// [`ResultCode::FatalError`].
pub(crate) async fn execute_call(id: i64, caller: &dyn Caller, call_timeout: Duration) -> CallResult {
    let start = Instant::now();

    let outcome = match AssertUnwindSafe(perform(id, caller, call_timeout))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            tracing::error!(call_id = id, reason = %reason, "Caller panicked");
            Outcome {
                request: RawRequest {
                    id,
                    payload: Vec::new(),
                },
                response: None,
                code: ResultCode::FatalError,
                message: format!("call panicked: {reason}"),
                elapsed: start.elapsed(),
            }
        }
    };

    CallResult {
        id,
        request: outcome.request,
        response: outcome.response,
        code: outcome.code,
        message: outcome.message,
        elapsed: outcome.elapsed,
        timestamp: chrono::Utc::now(),
    }
}

async fn perform(id: i64, caller: &dyn Caller, call_timeout: Duration) -> Outcome {
    let mut request = caller.build_request();
    request.id = id;

    let start = Instant::now();
    let executed = caller.execute(&request, call_timeout).await;
    let elapsed = start.elapsed();

    match executed {
        Err(err) => Outcome {
            request,
            response: None,
            code: err.to_result_code(),
            message: err.to_string(),
            elapsed,
        },
        Ok(response) if elapsed > call_timeout => Outcome {
            request,
            response: Some(response),
            code: ResultCode::TimeoutWarning,
            message: format!("response took {elapsed:?}, exceeding timeout {call_timeout:?}"),
            elapsed,
        },
        Ok(response) => {
            let (code, message) = caller.validate(&request, &response);
            let (code, message) = if code.is_verdict() {
                (code, message)
            } else {
                (
                    ResultCode::FatalError,
                    format!("validator returned non-verdict code {} ({code}): {message}", code.code()),
                )
            };
            Outcome {
                request,
                response: Some(response),
                code,
                message,
                elapsed,
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
