//! Per-Endpoint Timeout Tiers
//!
//! Different backend operations need different budgets: health probes should
//! answer in moments, while agent/LLM calls legitimately run long. The policy
//! maps a request path to one of three tiers by substring, in priority order:
//!
//! 1. path contains `"agent"` -> long
//! 2. path contains `"health"` -> quick
//! 3. anything else -> default
//!
//! A path matching both `agent` and `health` resolves to long.
//!
//! Budgets are mutable at runtime; a request that has already selected its
//! budget keeps the value it captured.

use std::time::Duration;

use parking_lot::RwLock;

/// Quick tier: health probes and other cheap checks.
pub const QUICK_TIMEOUT: Duration = Duration::from_secs(5);
/// Default tier: ordinary CRUD calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Long tier: agent/LLM endpoints.
pub const LONG_TIMEOUT: Duration = Duration::from_secs(30);

/// The three timeout budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub quick: Duration,
    pub default: Duration,
    pub long: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            quick: QUICK_TIMEOUT,
            default: DEFAULT_TIMEOUT,
            long: LONG_TIMEOUT,
        }
    }
}

/// Partial update applied over the current budgets; `None` fields are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutUpdate {
    pub quick: Option<Duration>,
    pub default: Option<Duration>,
    pub long: Option<Duration>,
}

impl TimeoutUpdate {
    pub fn quick(mut self, budget: Duration) -> Self {
        self.quick = Some(budget);
        self
    }

    pub fn default_tier(mut self, budget: Duration) -> Self {
        self.default = Some(budget);
        self
    }

    pub fn long(mut self, budget: Duration) -> Self {
        self.long = Some(budget);
        self
    }
}

/// Runtime-mutable timeout policy. Readers always see the latest values.
#[derive(Debug)]
pub struct TimeoutPolicy {
    budgets: RwLock<Timeouts>,
}

impl TimeoutPolicy {
    pub fn new(initial: Timeouts) -> Self {
        Self {
            budgets: RwLock::new(initial),
        }
    }

    /// Select the budget for a request path. Priority: agent > health > default.
    pub fn select(&self, path: &str) -> Duration {
        let budgets = self.budgets.read();
        if path.contains("agent") {
            budgets.long
        } else if path.contains("health") {
            budgets.quick
        } else {
            budgets.default
        }
    }

    /// Current budgets.
    pub fn get(&self) -> Timeouts {
        *self.budgets.read()
    }

    /// Apply a partial update.
    pub fn set(&self, update: TimeoutUpdate) {
        let mut budgets = self.budgets.write();
        if let Some(quick) = update.quick {
            budgets.quick = quick;
        }
        if let Some(default) = update.default {
            budgets.default = default;
        }
        if let Some(long) = update.long {
            budgets.long = long;
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::new(Timeouts::default())
    }
}
