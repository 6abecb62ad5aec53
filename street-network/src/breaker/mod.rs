//! Backend call protocol: timeout plus circuit breaker.
//!
//! Every outbound call made by a backend goes through [`CircuitBreaker::call`]:
//!
//! ```text
//! Closed   → Open:      fail_max consecutive failures
//! Open     → HalfOpen:  reset_timeout elapsed (next call is the trial)
//! HalfOpen → Closed:    trial succeeds
//! HalfOpen → Open:      trial fails
//! ```
//!
//! Calls are never retried here; deciding how to degrade is the caller's job.
//! Breaker state is shared by every request using the same backend instance.

mod error;

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

pub use error::CallError;

/// Default consecutive failures before opening.
const DEFAULT_FAIL_MAX: u32 = 5;

/// Default cooldown before a trial call, in seconds.
const DEFAULT_RESET_TIMEOUT_SECS: u64 = 60;

/// Default per-call timeout, in seconds.
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

/// Configuration for a circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker
    pub fail_max: u32,
    /// Seconds to wait in the open state before allowing a trial
    pub reset_timeout_secs: u64,
    /// Timeout applied to every call, in seconds
    pub call_timeout_secs: u64,
}

impl BreakerConfig {
    /// Set the consecutive failure threshold.
    pub fn with_fail_max(mut self, n: u32) -> Self {
        self.fail_max = n;
        self
    }

    /// Set the open-state cooldown.
    pub fn with_reset_timeout(mut self, secs: u64) -> Self {
        self.reset_timeout_secs = secs;
        self
    }

    /// Set the call timeout.
    pub fn with_call_timeout(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.reset_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            fail_max: DEFAULT_FAIL_MAX,
            reset_timeout_secs: DEFAULT_RESET_TIMEOUT_SECS,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }
}

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Snapshot of a breaker, for status reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerStatus {
    pub current_state: BreakerState,
    pub fail_counter: u32,
    pub reset_timeout: u64,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    fail_counter: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// A per-backend circuit breaker with a call timeout.
#[derive(Debug)]
pub struct CircuitBreaker {
    backend: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a closed breaker for the named backend.
    pub fn new(backend: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            backend: backend.into(),
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                fail_counter: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Run `call` under the breaker and the call timeout.
    ///
    /// Returns `CallError::BreakerOpen` without polling `call` when the
    /// breaker is open (or a half-open trial is already in flight).
    pub async fn call<T, F>(&self, call: F) -> Result<T, CallError>
    where
        F: Future<Output = Result<T, CallError>>,
    {
        let mut pending = Pending {
            breaker: self,
            is_trial: self.before_call()?,
            settled: false,
        };

        let timeout = self.config.call_timeout();
        let outcome = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CallError::Timeout {
                backend: self.backend.clone(),
                timeout,
            }),
        };

        pending.settled = true;
        match &outcome {
            Ok(_) => self.on_success(),
            Err(e) => self.on_failure(e),
        }
        outcome
    }

    /// Current state, reporting an expired open state as half-open.
    pub fn state(&self) -> BreakerState {
        let inner = self.lock();
        match inner.state {
            BreakerState::Open if self.cooldown_elapsed(&inner) => BreakerState::HalfOpen,
            state => state,
        }
    }

    pub fn status(&self) -> BreakerStatus {
        let fail_counter = self.lock().fail_counter;
        BreakerStatus {
            current_state: self.state(),
            fail_counter,
            reset_timeout: self.config.reset_timeout_secs,
        }
    }

    /// Admit a call. Returns whether it is the half-open trial.
    fn before_call(&self) -> Result<bool, CallError> {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => Ok(false),
            BreakerState::Open if self.cooldown_elapsed(&inner) => {
                debug!(backend = %self.backend, "circuit breaker half-open, allowing trial call");
                inner.state = BreakerState::HalfOpen;
                inner.trial_in_flight = true;
                Ok(true)
            }
            BreakerState::HalfOpen if !inner.trial_in_flight => {
                inner.trial_in_flight = true;
                Ok(true)
            }
            BreakerState::Open | BreakerState::HalfOpen => Err(CallError::BreakerOpen {
                backend: self.backend.clone(),
            }),
        }
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        if inner.state == BreakerState::HalfOpen {
            debug!(backend = %self.backend, "trial call succeeded, closing circuit breaker");
        }
        inner.state = BreakerState::Closed;
        inner.fail_counter = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    fn on_failure(&self, error: &CallError) {
        let mut inner = self.lock();
        inner.fail_counter = inner.fail_counter.saturating_add(1);
        inner.trial_in_flight = false;

        let should_open = match inner.state {
            BreakerState::HalfOpen => true,
            BreakerState::Closed => inner.fail_counter >= self.config.fail_max,
            BreakerState::Open => false,
        };

        if should_open {
            warn!(
                backend = %self.backend,
                failures = inner.fail_counter,
                reason = error.reason(),
                "opening circuit breaker"
            );
            inner.state = BreakerState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    fn cooldown_elapsed(&self, inner: &Inner) -> bool {
        inner
            .opened_at
            .is_some_and(|at| at.elapsed() >= self.config.reset_timeout())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the counters invalid.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// An admitted call that has not recorded its outcome yet.
///
/// Dropping an unsettled trial (caller cancelled or timed out around it)
/// frees the half-open slot, so the next call becomes the trial.
struct Pending<'a> {
    breaker: &'a CircuitBreaker,
    is_trial: bool,
    settled: bool,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if self.settled || !self.is_trial {
            return;
        }
        let mut inner = self.breaker.lock();
        if inner.state == BreakerState::HalfOpen {
            debug!(backend = %self.breaker.backend, "trial call abandoned, releasing half-open slot");
            inner.trial_in_flight = false;
        }
    }
}
