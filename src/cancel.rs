//! Cancellation Budgets
//!
//! Converts a timeout duration into a cancellation signal for an in-flight
//! call, so a hung connection cannot block a caller forever. A one-shot timer
//! task cancels the token when the budget elapses; dropping the
//! [`CancelTimer`] aborts the timer, so a call that settles early leaves no
//! dangling timer behind.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One-shot timer bound to a cancellation token.
///
/// Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct CancelTimer {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl CancelTimer {
    /// Arm a timer that cancels the token after `budget`.
    pub fn arm(budget: Duration) -> Self {
        let token = CancellationToken::new();
        let armed = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            armed.cancel();
        });
        Self { token, timer }
    }

    /// A clone of the token to race the in-flight call against.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the budget has elapsed.
    pub fn fired(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for CancelTimer {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
