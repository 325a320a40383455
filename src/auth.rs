//! Session Token Provider
//!
//! The executor fetches a bearer token fresh for every call through this
//! seam; it never caches one. A provider that cannot produce a token returns
//! `None` - its own failures are swallowed and the request simply goes out
//! unauthenticated.

use async_trait::async_trait;

/// Supplies the bearer token for outgoing requests, or none.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// Provider that never supplies a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl TokenProvider for NoAuth {
    async fn access_token(&self) -> Option<String> {
        None
    }
}

/// Provider backed by a fixed token string. Mostly useful in tests and
/// short-lived tools where the token arrives out of band.
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Option<String> {
        if self.token.is_empty() {
            None
        } else {
            Some(self.token.clone())
        }
    }
}

/// Provider that reads an environment variable on every call, so a token
/// rotated by an external session manager is picked up immediately.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn access_token(&self) -> Option<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.is_empty() => Some(token),
            _ => None,
        }
    }
}
