//! Request Executor
//!
//! The single choke point every backend call funnels through. Each call:
//!
//! 1. passes the circuit breaker gate (a rejection costs no I/O and is not
//!    recorded as a failure)
//! 2. fetches a fresh bearer token (absence is fine)
//! 3. selects its timeout tier by path and arms a cancellation budget
//! 4. performs the HTTP call, racing the budget
//! 5. classifies the outcome, records exactly one breaker mutation, and
//!    returns a uniform `{data, error}` result
//!
//! The executor never returns `Err` and never retries; callers branch on
//! `error` presence and own any retry policy.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{EnvToken, TokenProvider};
use crate::cancel::CancelTimer;
use crate::classify::{classify_status, classify_transport};
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::resilience::{CircuitBreaker, CircuitState};
use crate::timeout::{TimeoutPolicy, TimeoutUpdate, Timeouts};

/// Uniform call outcome: exactly one of `data`/`error` is set, except for
/// legitimately empty successful responses (e.g. delete), where both are
/// `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResult<T> {
    fn success(data: Option<T>) -> Self {
        Self { data, error: None }
    }

    fn failure(err: &ApiError) -> Self {
        Self {
            data: None,
            error: Some(err.to_string()),
        }
    }

    /// Whether the call completed without a classified failure.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-call options: extra headers and an optional JSON body.
///
/// Caller headers are merged last, so they may override the base
/// content-type/authorization headers but not vice versa.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The backend API client.
///
/// Cheap to share behind an `Arc`; the breaker and timeout policy are the
/// only mutable state and both are internally synchronized.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token_provider: Arc<dyn TokenProvider>,
    breaker: Arc<CircuitBreaker>,
    timeouts: TimeoutPolicy,
}

impl ApiClient {
    /// Build a client from configuration.
    ///
    /// The default token provider reads `DAYFLOW_API_TOKEN` fresh on every
    /// call; swap it with [`with_token_provider`].
    ///
    /// [`with_token_provider`]: ApiClient::with_token_provider
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ApiError::Unexpected {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token_provider: Arc::new(EnvToken::new("DAYFLOW_API_TOKEN")),
            breaker: Arc::new(CircuitBreaker::new(config.breaker_config())),
            timeouts: TimeoutPolicy::new(config.initial_timeouts()),
        })
    }

    /// Replace the session token provider.
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = provider;
        self
    }

    /// Inject a shared breaker handle, e.g. one shared across clients or a
    /// tightly-configured one in tests.
    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    /// Current circuit breaker state.
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Current timeout budgets.
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts.get()
    }

    /// Adjust timeout budgets at runtime. In-flight requests keep the budget
    /// they captured.
    pub fn set_timeouts(&self, update: TimeoutUpdate) {
        self.timeouts.set(update);
    }

    /// GET a path.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::GET, path, RequestOptions::default())
            .await
    }

    /// POST a path with an optional JSON body.
    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Option<Value>) -> ApiResult<T> {
        self.request(Method::POST, path, RequestOptions { body, ..Default::default() })
            .await
    }

    /// PATCH a path with an optional JSON body.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> ApiResult<T> {
        self.request(Method::PATCH, path, RequestOptions { body, ..Default::default() })
            .await
    }

    /// DELETE a path.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::DELETE, path, RequestOptions::default())
            .await
    }

    /// Execute one call. Never returns `Err`; every failure is folded into
    /// the `error` slot of the result.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        match self.attempt(method.clone(), path, options).await {
            Ok(data) => ApiResult::success(data),
            Err(err) => {
                warn!(%method, path, error = %err, "request failed");
                ApiResult::failure(&err)
            }
        }
    }

    /// One gated attempt with exactly one breaker mutation if admitted.
    async fn attempt<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<T>> {
        // A rejection here performs no I/O and must not touch the breaker.
        self.breaker.check()?;

        let outcome = self.perform(method, path, options).await;
        match &outcome {
            Ok(_) => self.breaker.record_success(),
            Err(_) => self.breaker.record_failure(),
        }
        outcome
    }

    async fn perform<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<T>> {
        let token = self.token_provider.access_token().await;
        let budget = self.timeouts.select(path);
        let timer = CancelTimer::arm(budget);
        let cancelled = timer.token();

        let url = self.join_url(path);
        debug!(path, ?budget, authenticated = token.is_some(), "sending request");

        let mut request = self.http.request(method, url);
        if let Some(body) = &options.body {
            let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Unexpected {
                message: format!("Failed to encode request body: {}", e),
            })?;
            request = request.body(bytes);
        }
        request = request.headers(build_headers(token.as_deref(), &options.headers));

        let response = tokio::select! {
            _ = cancelled.cancelled() => return Err(ApiError::Timeout),
            sent = request.send() => {
                sent.map_err(|e| classify_transport(&e, timer.fired()))?
            }
        };

        let status = response.status();
        let body = tokio::select! {
            _ = cancelled.cancelled() => return Err(ApiError::Timeout),
            text = response.text() => {
                text.map_err(|e| classify_transport(&e, timer.fired()))?
            }
        };

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body));
        }

        if body.trim().is_empty() {
            // Legitimately empty success (delete, 204).
            return Ok(None);
        }

        serde_json::from_str::<T>(&body)
            .map(Some)
            .map_err(|e| ApiError::Unexpected {
                message: format!("Invalid response body: {}", e),
            })
    }

    /// Probe the service root without authentication. Uses a fixed 3 second
    /// budget and bypasses the circuit breaker entirely: it neither consults
    /// nor mutates breaker state.
    pub async fn test_connection(&self) -> bool {
        let timer = CancelTimer::arm(Duration::from_secs(3));
        let cancelled = timer.token();
        let request = self.http.get(format!("{}/", self.base_url));

        tokio::select! {
            _ = cancelled.cancelled() => false,
            sent = request.send() => sent.map(|r| r.status().is_success()).unwrap_or(false),
        }
    }

    fn join_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("circuit_state", &self.breaker.state())
            .finish()
    }
}

/// Base headers first, bearer token if present, caller headers merged last.
/// A caller header replaces a base header with the same name; headers that
/// fail validation are dropped.
fn build_headers(token: Option<&str>, caller: &[(String, String)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => debug!("token contains invalid header characters, sending unauthenticated"),
        }
    }

    for (name, value) in caller {
        let parsed = HeaderName::from_bytes(name.as_bytes())
            .ok()
            .zip(HeaderValue::from_str(value).ok());
        match parsed {
            Some((name, value)) => {
                headers.insert(name, value);
            }
            None => debug!(header = name.as_str(), "dropping invalid caller header"),
        }
    }

    headers
}
