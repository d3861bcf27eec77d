//! Retry policy value object.
//!
//! Resolved from the application settings singleton at each scheduler
//! invocation so configuration changes take effect without a restart.

use crate::types::Timestamp;

/// Default maximum number of send attempts per item.
pub const DEFAULT_RETRY_ATTEMPTS: i32 = 3;

/// Default interval between attempts, in minutes.
pub const DEFAULT_RETRY_INTERVAL_MINUTES: i64 = 5;

/// How many attempts an item gets and how far apart they are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of send attempts before the item is abandoned.
    pub max_attempts: i32,
    /// Backoff interval between attempts, in minutes.
    pub interval_minutes: i64,
}

impl RetryPolicy {
    pub fn new(max_attempts: i32, interval_minutes: i64) -> Self {
        Self {
            max_attempts,
            interval_minutes,
        }
    }

    /// The time at which a failed attempt made at `attempted_at` should be
    /// retried.
    pub fn next_retry_at(&self, attempted_at: Timestamp) -> Timestamp {
        attempted_at + chrono::Duration::minutes(self.interval_minutes)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_INTERVAL_MINUTES)
    }
}
