//! Dayflow Client - circuit-breaker-protected backend access
//!
//! Every screen of the Dayflow assistant funnels its backend calls through
//! this crate's single request executor. The executor gates each call behind
//! a circuit breaker, budgets it with a per-endpoint timeout tier, bounds it
//! with a cancellation signal, classifies whatever goes wrong, and hands the
//! caller a uniform `{data, error}` result - never an exception.
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`client`] | Request executor: get/post/patch/delete, `test_connection` |
//! | [`resilience`] | Circuit breaker (Closed/Open/HalfOpen gate) |
//! | [`timeout`] | Per-endpoint timeout tiers, mutable at runtime |
//! | [`cancel`] | Timeout budget -> cancellation signal |
//! | [`auth`] | Session token provider seam |
//! | [`classify`] | Pure failure classification (status/transport -> error) |
//! | [`config`] | Base URL and tuning knobs (env + TOML file) |
//! | [`error`] | Error taxonomy with user-facing messages |
//!
//! ## Example
//!
//! ```rust,ignore
//! use dayflow_client::{ApiClient, ClientConfig};
//!
//! let config = ClientConfig::load()?.with_env();
//! let client = ApiClient::new(&config)?;
//!
//! let result = client.get::<Task>("/api/tasks/t1").await;
//! match result.error {
//!     None => render(result.data),
//!     Some(message) => toast(message),
//! }
//! ```

pub mod auth;
pub mod cancel;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod resilience;
pub mod timeout;

// Error types
pub use error::{ApiError, Result};

// Executor types
pub use client::{ApiClient, ApiResult, RequestOptions};

// Resilience types
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Timeout types
pub use timeout::{TimeoutPolicy, TimeoutUpdate, Timeouts};

// Auth types
pub use auth::{EnvToken, NoAuth, StaticToken, TokenProvider};

// Cancellation types
pub use cancel::CancelTimer;

// Config types
pub use config::ClientConfig;
