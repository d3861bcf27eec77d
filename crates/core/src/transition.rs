//! The delivery state machine.
//!
//! Every status/date/retry-count change an item can undergo is computed
//! here and nowhere else. Callers (the provider `send_ready` path and the
//! scheduler's no-provider branch) apply the returned [`Transition`] to the
//! item and persist it with a conditional update.
//!
//! Lifecycle: `Scheduled` → (`Retrying`)* → `Sent` | `NotAvailable` |
//! `Abandoned`. The three right-hand statuses are terminal; terminal items
//! always carry a null `scheduled_send_date`.

use crate::retry::RetryPolicy;
use crate::status::DeliveryStatus;
use crate::types::Timestamp;

/// Result of one transport-level send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The provider accepted the message.
    Delivered,
    /// Message generation or transport failed; eligible for retry.
    Failed,
}

/// The item mutation produced by one scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: DeliveryStatus,
    pub scheduled_send_date: Option<Timestamp>,
    pub retry_count: i32,
}

/// Compute the transition for an item after a send attempt.
///
/// `retry_count` is the number of attempts made *before* this one. A failed
/// attempt consumes one unit of the retry budget; once `policy.max_attempts`
/// is spent the item is abandoned rather than rescheduled.
pub fn after_attempt(
    retry_count: i32,
    policy: &RetryPolicy,
    attempted_at: Timestamp,
    outcome: AttemptOutcome,
) -> Transition {
    match outcome {
        AttemptOutcome::Delivered => Transition {
            status: DeliveryStatus::Sent,
            scheduled_send_date: None,
            retry_count,
        },
        AttemptOutcome::Failed => {
            let attempts_made = retry_count + 1;
            if attempts_made >= policy.max_attempts {
                Transition {
                    status: DeliveryStatus::Abandoned,
                    scheduled_send_date: None,
                    retry_count: attempts_made,
                }
            } else {
                Transition {
                    status: DeliveryStatus::Retrying,
                    scheduled_send_date: Some(policy.next_retry_at(attempted_at)),
                    retry_count: attempts_made,
                }
            }
        }
    }
}

/// Compute the transition for an item whose destination type matches no
/// enabled provider.
///
/// This is decided before any provider is invoked and is terminal regardless
/// of how many attempts remain; a missing provider cannot be fixed by
/// retrying the item.
pub fn no_provider(retry_count: i32) -> Transition {
    Transition {
        status: DeliveryStatus::NotAvailable,
        scheduled_send_date: None,
        retry_count,
    }
}
