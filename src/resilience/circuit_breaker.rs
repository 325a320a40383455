//! Circuit Breaker Pattern
//!
//! Stops the client from hammering a failing backend, admitting one probe
//! after a cool-down to detect recovery.
//!
//! # States
//!
//! - **Closed**: normal operation, every call admitted
//! - **Open**: too many consecutive failures, calls rejected without I/O
//! - **Half-Open**: cool-down expired, exactly one trial call admitted
//!
//! # Contract
//!
//! [`CircuitBreaker::check`] must be called before every attempt, and exactly
//! one of [`record_success`]/[`record_failure`] after every attempt that
//! passed `check`. A rejection at `check` never touches the counters or the
//! failure timestamp.
//!
//! The interior is guarded by a mutex: state transitions happen atomically
//! under preemptive scheduling, and the Half-Open trial slot is claimed
//! inside `check` itself so two concurrent callers cannot both win it.
//!
//! A claimed trial whose record never arrives (the attempt future was
//! dropped mid-flight) expires after one reset period, and the next `check`
//! admits a replacement trial. Without the expiry a dropped trial would pin
//! the circuit in Half-Open forever.
//!
//! [`record_success`]: CircuitBreaker::record_success
//! [`record_failure`]: CircuitBreaker::record_failure

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests flow through
    Closed,
    /// Backend down - requests rejected immediately
    Open,
    /// Testing recovery - one trial request allowed through
    HalfOpen,
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Time to wait in Open before admitting a trial call
    pub reset_period: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_period: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Set failure threshold before circuit opens
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set cool-down before a trial call is admitted
    pub fn with_reset_period(mut self, period: Duration) -> Self {
        self.reset_period = period;
        self
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    /// When the current Half-Open trial was admitted, if one is in flight.
    trial_started: Option<Instant>,
}

/// Three-state gate tracking consecutive failures.
///
/// Lives for the process lifetime and resets silently to Closed on restart;
/// never persisted. Shared between callers via `Arc`.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                trial_started: None,
            }),
        }
    }

    /// Create a circuit breaker with default configuration
    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Get the current circuit state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Get the current consecutive failure count
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// Gate an attempt. `Ok(())` admits the call; `Err` rejects it with no
    /// I/O and no state mutation.
    ///
    /// An Open circuit whose cool-down has expired flips to Half-Open here
    /// and admits the caller as the single trial.
    pub fn check(&self) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed > self.config.reset_period {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_started = Some(Instant::now());
                    debug!("circuit half-open, admitting trial call");
                    Ok(())
                } else {
                    Err(ApiError::CircuitOpen)
                }
            }
            CircuitState::HalfOpen => {
                match inner.trial_started {
                    Some(started) if started.elapsed() <= self.config.reset_period => {
                        // The trial slot is taken; reject without mutating.
                        Err(ApiError::CircuitOpen)
                    }
                    _ => {
                        // No trial, or the previous trial was dropped
                        // without settling. Claim (or reclaim) the slot so
                        // the circuit cannot wedge in Half-Open.
                        inner.trial_started = Some(Instant::now());
                        Ok(())
                    }
                }
            }
        }
    }

    /// Record a successful attempt that previously passed [`check`].
    ///
    /// [`check`]: CircuitBreaker::check
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::Open => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.trial_started = None;
                debug!("trial call succeeded, circuit closed");
            }
        }
    }

    /// Record a failed attempt that previously passed [`check`].
    ///
    /// [`check`]: CircuitBreaker::check
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.last_failure = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!(
                        failures = inner.consecutive_failures,
                        "failure threshold reached, circuit opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.trial_started = None;
                warn!("trial call failed, circuit re-opened");
            }
            CircuitState::Open => {
                // A call admitted before the circuit opened settled late.
                // Keep counting; the timestamp refresh above extends the
                // cool-down.
                inner.consecutive_failures += 1;
            }
        }
    }

    /// Reset to Closed (for testing/admin purposes)
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.last_failure = None;
        inner.trial_started = None;
    }

    /// Force the circuit open (for testing/admin purposes)
    pub fn force_open(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Open;
        inner.last_failure = Some(Instant::now());
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::with_defaults()
    }
}
