//! Backend status reports.

use serde::Serialize;

use crate::breaker::BreakerStatus;
use crate::domain::StreetNetworkMode;

/// Diagnostics for one backend instance. Building it performs no I/O.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendStatus {
    pub id: String,
    pub class: String,
    pub modes: Vec<StreetNetworkMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<BreakerStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delegates: Vec<BackendStatus>,
}

impl BackendStatus {
    pub fn new(id: impl Into<String>, class: impl Into<String>, modes: &[StreetNetworkMode]) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            modes: modes.to_vec(),
            timeout: None,
            circuit_breaker: None,
            delegates: Vec::new(),
        }
    }

    /// Attach the breaker snapshot and call timeout.
    pub fn with_breaker(mut self, timeout_secs: u64, breaker: BreakerStatus) -> Self {
        self.timeout = Some(timeout_secs);
        self.circuit_breaker = Some(breaker);
        self
    }

    /// Attach the status of a wrapped backend.
    pub fn with_delegate(mut self, delegate: BackendStatus) -> Self {
        self.delegates.push(delegate);
        self
    }
}
