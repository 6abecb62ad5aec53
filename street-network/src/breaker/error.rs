//! Guarded call error types.

use std::time::Duration;

/// Errors from a guarded backend call.
///
/// Every variant except `BreakerOpen` counts as a failure for the breaker;
/// `BreakerOpen` means no I/O was attempted.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    /// The call did not complete in time
    #[error("{backend}: call timed out after {timeout:?}")]
    Timeout { backend: String, timeout: Duration },

    /// The breaker short-circuited the call
    #[error("{backend}: circuit breaker open")]
    BreakerOpen { backend: String },

    /// Connection or protocol failure
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The backend answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered something we could not read
    #[error("failed to decode response: {message}")]
    Decode { message: String },
}

impl CallError {
    /// Short reason label, used in logs and status reports.
    pub fn reason(&self) -> &'static str {
        match self {
            CallError::Timeout { .. } => "timeout",
            CallError::BreakerOpen { .. } => "circuit breaker open",
            CallError::Transport { .. } => "transport",
            CallError::Status { .. } => "status",
            CallError::Decode { .. } => "decode",
        }
    }
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CallError::Decode {
                message: err.to_string(),
            }
        } else {
            CallError::Transport {
                message: err.to_string(),
            }
        }
    }
}
