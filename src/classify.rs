//! Failure Classification
//!
//! Pure functions that map a raw outcome (HTTP status + body, or a transport
//! error) to a single [`ApiError`]. Deterministic and side-effect free so the
//! mapping can be tested without a network.

use serde_json::Value;

use crate::error::ApiError;

/// Classify a non-success HTTP response.
///
/// 401 and 403 get dedicated auth variants. Everything else goes through the
/// backend's loosely-typed error body: a JSON object with an optional `error`
/// field. A body that fails to parse is treated as an empty object, which
/// falls back to the generic `HTTP error! status: <code>` message.
pub fn classify_status(status: u16, body: &str) -> ApiError {
    match status {
        401 => ApiError::AuthExpired,
        403 => ApiError::AccessDenied,
        _ => {
            let parsed: Value = serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Default::default()));
            let message = parsed
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP error! status: {status}"));
            ApiError::Http { status, message }
        }
    }
}

/// Classify a failure that occurred before a response was produced.
///
/// `timer_fired` reports whether the request's cancellation budget elapsed;
/// a transport error that races the timer is still reported as a timeout.
pub fn classify_transport(err: &reqwest::Error, timer_fired: bool) -> ApiError {
    if timer_fired || err.is_timeout() {
        return ApiError::Timeout;
    }
    if err.is_connect() || err.is_request() || err.is_body() {
        return ApiError::Network;
    }
    ApiError::Unexpected {
        message: err.to_string(),
    }
}
