//! The delivery provider capability contract.

use async_trait::async_trait;
use chrono::Utc;

use courier_core::retry::RetryPolicy;
use courier_core::status::DeliveryStatus;
use courier_core::transition::{self, AttemptOutcome};
use courier_db::models::destination::Destination;
use courier_db::models::item::NotificationItem;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for a single provider operation.
///
/// Both kinds follow the retry policy: malformed content may be fixed by a
/// later event merge, and transport failures are transient by assumption.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Required destination or content data is malformed.
    #[error("message generation failed: {0}")]
    MessageGeneration(String),

    /// The transport attempt failed (timeout, rejection, backend down).
    #[error("transport failure: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// DeliveryProvider
// ---------------------------------------------------------------------------

/// A pluggable backend capable of rendering and transporting a message for
/// one destination type.
///
/// Implementors supply [`generate_message`](DeliveryProvider::generate_message)
/// and [`transmit`](DeliveryProvider::transmit); the shared
/// [`send_ready`](DeliveryProvider::send_ready) drives one attempt and owns
/// the retry bookkeeping for every provider.
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// The destination type this provider handles, e.g. `"email"`.
    fn destination_type(&self) -> &str;

    /// Produce the provider-specific message payload for an item.
    ///
    /// Pure transform: no side effects, no transport.
    async fn generate_message(
        &self,
        item: &NotificationItem,
        destination: &Destination,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Perform one transport attempt for a previously generated payload.
    async fn transmit(
        &self,
        payload: &serde_json::Value,
        destination: &Destination,
    ) -> Result<(), ProviderError>;

    /// Execute one send attempt and apply the resulting state transition to
    /// the item in place.
    ///
    /// No error escapes: failures are converted into `Retrying` or
    /// `Abandoned` per the policy and logged. The caller persists the
    /// mutated item, one conditional save per scheduler invocation.
    async fn send_ready(
        &self,
        item: &mut NotificationItem,
        destination: &Destination,
        policy: &RetryPolicy,
    ) {
        let attempted_at = Utc::now();

        let outcome = match self.generate_message(item, destination).await {
            Ok(payload) => match self.transmit(&payload, destination).await {
                Ok(()) => AttemptOutcome::Delivered,
                Err(err) => {
                    tracing::warn!(
                        item_id = item.id,
                        destination_type = self.destination_type(),
                        error = %err,
                        "Send attempt failed"
                    );
                    AttemptOutcome::Failed
                }
            },
            Err(err) => {
                tracing::warn!(
                    item_id = item.id,
                    destination_type = self.destination_type(),
                    error = %err,
                    "Message generation failed"
                );
                AttemptOutcome::Failed
            }
        };

        let next = transition::after_attempt(item.retry_count, policy, attempted_at, outcome);
        if next.status == DeliveryStatus::Abandoned {
            tracing::error!(
                item_id = item.id,
                attempts = next.retry_count,
                "Retry budget exhausted, abandoning item"
            );
        }
        item.apply(&next);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use courier_core::types::Timestamp;

    /// Provider whose transmit outcomes follow a pre-loaded script.
    struct ScriptedProvider {
        outcomes: Mutex<VecDeque<Result<(), ProviderError>>>,
        generation_fails: bool,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<Result<(), ProviderError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                generation_fails: false,
            }
        }

        fn failing_generation() -> Self {
            Self {
                outcomes: Mutex::new(VecDeque::new()),
                generation_fails: true,
            }
        }
    }

    #[async_trait]
    impl DeliveryProvider for ScriptedProvider {
        fn destination_type(&self) -> &str {
            "scripted"
        }

        async fn generate_message(
            &self,
            _item: &NotificationItem,
            _destination: &Destination,
        ) -> Result<serde_json::Value, ProviderError> {
            if self.generation_fails {
                Err(ProviderError::MessageGeneration("bad address".to_string()))
            } else {
                Ok(serde_json::json!({}))
            }
        }

        async fn transmit(
            &self,
            _payload: &serde_json::Value,
            _destination: &Destination,
        ) -> Result<(), ProviderError> {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProviderError::Transport("script exhausted".to_string())))
        }
    }

    fn at(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn scheduled_item(retry_count: i32) -> NotificationItem {
        NotificationItem {
            id: 1,
            content_source_id: 10,
            content_source_type: "ticket".to_string(),
            subscriber_id: "alice".to_string(),
            destination_id: 2,
            status_id: DeliveryStatus::Scheduled.id(),
            scheduled_send_date: Some(at(9)),
            retry_count,
            events: serde_json::json!([]),
            created_at: at(8),
            updated_at: at(8),
        }
    }

    fn destination() -> Destination {
        Destination {
            id: 2,
            subscriber_id: "alice".to_string(),
            destination_type: "scripted".to_string(),
            address: "opaque".to_string(),
            display_name: None,
            created_at: at(8),
        }
    }

    #[tokio::test]
    async fn successful_attempt_marks_item_sent() {
        let provider = ScriptedProvider::new(vec![Ok(())]);
        let mut item = scheduled_item(0);

        provider
            .send_ready(&mut item, &destination(), &RetryPolicy::new(3, 5))
            .await;

        assert_eq!(item.status(), Some(DeliveryStatus::Sent));
        assert_eq!(item.scheduled_send_date, None);
    }

    #[tokio::test]
    async fn transport_failure_reschedules_within_budget() {
        let provider =
            ScriptedProvider::new(vec![Err(ProviderError::Transport("timeout".to_string()))]);
        let mut item = scheduled_item(0);
        let before = Utc::now();

        provider
            .send_ready(&mut item, &destination(), &RetryPolicy::new(3, 5))
            .await;

        assert_eq!(item.status(), Some(DeliveryStatus::Retrying));
        assert_eq!(item.retry_count, 1);
        let rescheduled = item.scheduled_send_date.expect("retry date set");
        assert!(rescheduled >= before + chrono::Duration::minutes(5));
    }

    #[tokio::test]
    async fn final_failure_abandons_the_item() {
        let provider =
            ScriptedProvider::new(vec![Err(ProviderError::Transport("rejected".to_string()))]);
        let mut item = scheduled_item(2);

        provider
            .send_ready(&mut item, &destination(), &RetryPolicy::new(3, 5))
            .await;

        assert_eq!(item.status(), Some(DeliveryStatus::Abandoned));
        assert_eq!(item.scheduled_send_date, None);
        assert_eq!(item.retry_count, 3);
    }

    #[tokio::test]
    async fn generation_failure_follows_the_retry_policy() {
        let provider = ScriptedProvider::failing_generation();
        let mut item = scheduled_item(0);

        provider
            .send_ready(&mut item, &destination(), &RetryPolicy::new(3, 5))
            .await;

        assert_eq!(item.status(), Some(DeliveryStatus::Retrying));
        assert_eq!(item.retry_count, 1);
    }
}
