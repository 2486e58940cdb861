//! The Caller trait implemented by load targets
//!
//! The generator only sequences calls. Building requests, talking to the
//! target and judging responses all live behind this trait.

use crate::result::{RawRequest, RawResponse, ResultCode};
use async_trait::async_trait;
use std::time::Duration;

// ============================================================================
// Caller Trait
// ============================================================================

/// A load target
///
/// Implementations are shared across every in-flight call via `Arc`, so all
/// methods take `&self`.
#[async_trait]
pub trait Caller: Send + Sync {
    /// Build the next request
    ///
    /// The returned request's `id` is overwritten with the call id.
    fn build_request(&self) -> RawRequest;

    /// Send a request and wait for the response
    ///
    /// The implementation is responsible for honouring `timeout` and should
    /// return [`CallError::Timeout`] when it is exceeded.
    async fn execute(
        &self,
        request: &RawRequest,
        timeout: Duration,
    ) -> Result<RawResponse, CallError>;

    /// Judge a response
    ///
    /// Expected to return [`ResultCode::Success`], [`ResultCode::ResponseError`]
    /// or [`ResultCode::CalleeError`] together with a short message.
    fn validate(&self, request: &RawRequest, response: &RawResponse) -> (ResultCode, String);
}

/// Transport-level failures reported by [`Caller::execute`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// The call did not finish within the timeout
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// Any other transport failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl CallError {
    /// Map to the result code this failure is reported under
    pub fn to_result_code(&self) -> ResultCode {
        match self {
            CallError::Timeout(_) => ResultCode::TimeoutWarning,
            CallError::Transport(_) => ResultCode::CallError,
        }
    }
}
