//! Dayflow Client Error Types
//!
//! Every failure the request executor can observe collapses into one of these
//! variants. The `Display` impl produces the exact user-facing string that
//! callers surface directly (toast/alert), so nothing downstream needs to
//! discriminate on error *types* - the executor converts each variant into
//! the `error` slot of [`crate::ApiResult`] and never lets one escape as a
//! panic or a raw `Err`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// All failure modes of a single request attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The circuit breaker is Open and the cool-down has not expired.
    /// No I/O was attempted for this call.
    #[error("Service temporarily unavailable. Please try again in a moment.")]
    CircuitOpen,

    /// HTTP 401 from the backend.
    #[error("Authentication expired. Please log in again.")]
    AuthExpired,

    /// HTTP 403 from the backend.
    #[error("Access denied. Please check your authentication.")]
    AccessDenied,

    /// Any other non-success status. The message comes from the response
    /// body's optional `error` field, falling back to a generic string.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The per-request budget elapsed before a response arrived.
    #[error("Request timed out. The server may be unresponsive.")]
    Timeout,

    /// Transport-level failure (DNS, refused connection, dropped socket).
    #[error("Unable to connect to server. Please check your connection.")]
    Network,

    /// Anything else thrown before a response was produced.
    #[error("{message}")]
    Unexpected { message: String },
}

impl ApiError {
    /// Check if the failure is worth retrying from the caller's side.
    ///
    /// The executor itself never retries; this is advisory for callers
    /// that implement their own retry policy.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::CircuitOpen | Self::Timeout | Self::Network => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The user-facing message for this error.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
