//! Request, response and call result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque request produced by a [`crate::Caller`]
///
/// The generator never looks at the payload. It only stamps the call id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRequest {
    /// Call id assigned by the dispatch loop
    pub id: i64,

    /// Request bytes
    pub payload: Vec<u8>,
}

impl RawRequest {
    /// Create a request carrying the given payload
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id: 0,
            payload: payload.into(),
        }
    }
}

/// Opaque response returned by a [`crate::Caller`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    /// Id of the request this answers
    pub id: i64,

    /// Response bytes
    pub payload: Vec<u8>,
}

impl RawResponse {
    /// Create a response for request `id`
    pub fn new(id: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }
}

/// Outcome classification of a single call
///
/// The numeric ordinals are fixed and exposed through [`ResultCode::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    /// Call succeeded and the response validated
    Success,
    /// Call exceeded the per-call timeout
    TimeoutWarning,
    /// Transport-level failure
    CallError,
    /// Response arrived but its content is wrong
    ResponseError,
    /// Target reported an internal error
    CalleeError,
    /// Unrecoverable fault inside the call executor
    FatalError,
}

impl ResultCode {
    /// All codes in ordinal order
    pub const ALL: [ResultCode; 6] = [
        ResultCode::Success,
        ResultCode::TimeoutWarning,
        ResultCode::CallError,
        ResultCode::ResponseError,
        ResultCode::CalleeError,
        ResultCode::FatalError,
    ];

    /// Fixed numeric ordinal
    pub fn code(&self) -> u32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::TimeoutWarning => 1001,
            ResultCode::CallError => 2001,
            ResultCode::ResponseError => 2002,
            ResultCode::CalleeError => 2003,
            ResultCode::FatalError => 3001,
        }
    }

    /// Human-readable name
    pub fn plain(&self) -> &'static str {
        match self {
            ResultCode::Success => "Success",
            ResultCode::TimeoutWarning => "Call Timeout Warning",
            ResultCode::CallError => "Call Error",
            ResultCode::ResponseError => "Response Error",
            ResultCode::CalleeError => "Callee Error",
            ResultCode::FatalError => "Call Fatal Error",
        }
    }

    /// Whether this code is one a validator is allowed to return
    pub fn is_verdict(&self) -> bool {
        matches!(
            self,
            ResultCode::Success | ResultCode::ResponseError | ResultCode::CalleeError
        )
    }

    /// Check if this code indicates success
    pub fn is_success(&self) -> bool {
        matches!(self, ResultCode::Success)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plain())
    }
}

/// Error returned when decoding an unknown ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown result code: {0}")]
pub struct UnknownResultCode(pub u32);

impl TryFrom<u32> for ResultCode {
    type Error = UnknownResultCode;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        ResultCode::ALL
            .into_iter()
            .find(|code| code.code() == value)
            .ok_or(UnknownResultCode(value))
    }
}

/// Terminal outcome of one admitted call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    /// Call id
    pub id: i64,

    /// Request that was sent
    pub request: RawRequest,

    /// Response, if one arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<RawResponse>,

    /// Outcome classification
    pub code: ResultCode,

    /// Short description of the outcome
    pub message: String,

    /// Wall time spent in `execute`
    pub elapsed: Duration,

    /// When the call reached its terminal outcome
    pub timestamp: DateTime<Utc>,
}

impl CallResult {
    /// Check if the call succeeded
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_ordinals() {
        assert_eq!(ResultCode::Success.code(), 0);
        assert_eq!(ResultCode::TimeoutWarning.code(), 1001);
        assert_eq!(ResultCode::CallError.code(), 2001);
        assert_eq!(ResultCode::ResponseError.code(), 2002);
        assert_eq!(ResultCode::CalleeError.code(), 2003);
        assert_eq!(ResultCode::FatalError.code(), 3001);
    }

    #[test]
    fn test_result_code_from_ordinal() {
        assert_eq!(ResultCode::try_from(2002), Ok(ResultCode::ResponseError));
        assert_eq!(ResultCode::try_from(42), Err(UnknownResultCode(42)));
    }

    #[test]
    fn test_result_code_display() {
        assert_eq!(ResultCode::TimeoutWarning.to_string(), "Call Timeout Warning");
        assert_eq!(ResultCode::FatalError.to_string(), "Call Fatal Error");
    }

    #[test]
    fn test_verdict_codes() {
        let verdicts: Vec<_> = ResultCode::ALL
            .into_iter()
            .filter(|code| code.is_verdict())
            .collect();
        assert_eq!(
            verdicts,
            vec![
                ResultCode::Success,
                ResultCode::ResponseError,
                ResultCode::CalleeError
            ]
        );
    }

    #[test]
    fn test_call_result_json_skips_missing_response() {
        let result = CallResult {
            id: 7,
            request: RawRequest::new("ping"),
            response: None,
            code: ResultCode::CallError,
            message: "connection refused".to_string(),
            elapsed: Duration::from_millis(3),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&result).unwrap();

        assert!(json.contains("\"code\":\"call_error\""));
        assert!(!json.contains("\"response\""));
        assert!(!result.is_success());
    }
}
