//! Per-search cancellation token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag with a deadline.
///
/// Cloning shares the flag. The flag is set explicitly by `cancel` or lazily
/// by the first `expired` call after the deadline.
#[derive(Clone, Debug)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Instant,
}

impl CancelToken {
    /// Creates a token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: now.checked_add(timeout).unwrap_or(now + Duration::from_secs(86_400 * 365)),
        }
    }

    /// Creates a token that only ends through `cancel`.
    pub fn never() -> Self {
        Self::with_timeout(Duration::MAX)
    }

    /// Sets the flag. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns true once cancelled. Does not read the clock.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns true once cancelled or past the deadline.
    pub fn expired(&self) -> bool {
        if self.is_cancelled() {
            return true;
        }
        if Instant::now() >= self.deadline {
            self.cancel();
            return true;
        }
        false
    }

    /// Returns the deadline.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}
