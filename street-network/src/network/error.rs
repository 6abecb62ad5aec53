//! Street-network error types.

use crate::breaker::CallError;
use crate::domain::StreetNetworkMode;

/// Errors returned by street-network backends.
///
/// "No solution" outcomes are not errors: they travel inside
/// [`DirectPathResponse`](super::DirectPathResponse).
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreetNetworkError {
    /// The guarded call failed (timeout, breaker open, transport, status)
    #[error(transparent)]
    Call(#[from] CallError),

    /// The backend does not handle this mode
    #[error("{backend} does not handle the mode {mode}")]
    UnsupportedMode {
        backend: String,
        mode: StreetNetworkMode,
    },

    /// A routing matrix was asked with several origins and several destinations
    #[error("routing matrix must be 1×n or n×1, got {origins}×{destinations}")]
    CardinalityViolation { origins: usize, destinations: usize },

    /// The backend answered something inconsistent
    #[error("invalid response from {backend}: {message}")]
    InvalidResponse { backend: String, message: String },

    /// Any other technical failure
    #[error("technical error: {0}")]
    Technical(String),
}

impl StreetNetworkError {
    /// Whether the caller can degrade (other mode, "no journey") instead of
    /// treating this as a bug upstream.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, StreetNetworkError::CardinalityViolation { .. })
    }
}
