//! Resilience patterns for fault-tolerant backend calls
//!
//! This module provides:
//! - [`circuit_breaker`]: Circuit breaker pattern
//!
//! Retry/backoff is deliberately absent: the executor makes at most one
//! attempt per call, and retry policy belongs to the caller.

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
