//! Webhook notification delivery via HTTP POST.
//!
//! [`WebhookProvider`] posts a JSON summary of an item's non-canceled
//! events to the destination address. The destination URL is opaque data
//! owned by the subscriber; it is validated at message-generation time so a
//! malformed URL follows the retry policy like any other content defect.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use courier_core::destination_types::DEST_WEBHOOK;
use courier_db::models::destination::Destination;
use courier_db::models::item::NotificationItem;

use crate::provider::{DeliveryProvider, ProviderError};
use crate::registry::ProviderBuildError;

/// Default HTTP request timeout for a single delivery attempt, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// WebhookProviderConfig
// ---------------------------------------------------------------------------

/// Configuration blob accepted by the webhook provider factory.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookProviderConfig {
    /// Per-attempt request timeout in seconds (defaults to 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for WebhookProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// WebhookProvider
// ---------------------------------------------------------------------------

/// Delivers notification payloads to external HTTP endpoints for
/// `"webhook"` destinations.
pub struct WebhookProvider {
    client: reqwest::Client,
}

impl WebhookProvider {
    /// Construct the provider from its descriptor configuration blob.
    ///
    /// A null blob is accepted and yields the defaults.
    pub fn from_config(config: serde_json::Value) -> Result<Self, ProviderBuildError> {
        let config: WebhookProviderConfig = if config.is_null() {
            WebhookProviderConfig::default()
        } else {
            serde_json::from_value(config)
                .map_err(|e| ProviderBuildError::InvalidConfig(e.to_string()))?
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderBuildError::InvalidConfig(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DeliveryProvider for WebhookProvider {
    fn destination_type(&self) -> &str {
        DEST_WEBHOOK
    }

    async fn generate_message(
        &self,
        item: &NotificationItem,
        destination: &Destination,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = reqwest::Url::parse(&destination.address)
            .map_err(|e| ProviderError::MessageGeneration(format!("destination url: {e}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ProviderError::MessageGeneration(format!(
                "unsupported url scheme: {}",
                url.scheme()
            )));
        }

        let events: Vec<serde_json::Value> = item
            .parsed_events()
            .into_iter()
            .filter(|e| !e.is_canceled)
            .map(|e| {
                serde_json::json!({
                    "event_text": e.event_text,
                    "occurred_at": e.occurred_at,
                })
            })
            .collect();
        if events.is_empty() {
            return Err(ProviderError::MessageGeneration(
                "item has no deliverable events".to_string(),
            ));
        }

        Ok(serde_json::json!({
            "content_source_type": item.content_source_type,
            "content_source_id": item.content_source_id,
            "subscriber_id": item.subscriber_id,
            "events": events,
        }))
    }

    async fn transmit(
        &self,
        payload: &serde_json::Value,
        destination: &Destination,
    ) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(&destination.address)
            .json(payload)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Transport(format!(
                "webhook returned HTTP {}",
                response.status().as_u16()
            )));
        }

        tracing::info!(url = %destination.address, "Webhook notification delivered");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use courier_core::status::DeliveryStatus;

    fn provider() -> WebhookProvider {
        WebhookProvider::from_config(serde_json::Value::Null).expect("default config")
    }

    fn item_with_events(events: serde_json::Value) -> NotificationItem {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        NotificationItem {
            id: 1,
            content_source_id: 42,
            content_source_type: "ticket".to_string(),
            subscriber_id: "alice".to_string(),
            destination_id: 3,
            status_id: DeliveryStatus::Scheduled.id(),
            scheduled_send_date: Some(now),
            retry_count: 0,
            events,
            created_at: now,
            updated_at: now,
        }
    }

    fn webhook_destination(address: &str) -> Destination {
        Destination {
            id: 3,
            subscriber_id: "alice".to_string(),
            destination_type: DEST_WEBHOOK.to_string(),
            address: address.to_string(),
            display_name: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn from_config_accepts_null_and_explicit_timeouts() {
        assert!(WebhookProvider::from_config(serde_json::Value::Null).is_ok());
        assert!(WebhookProvider::from_config(serde_json::json!({"timeout_secs": 3})).is_ok());
    }

    #[tokio::test]
    async fn generate_message_summarizes_live_events() {
        let item = item_with_events(serde_json::json!([
            {"event_text": "alice commented", "is_canceled": true, "occurred_at": "2026-03-01T09:00:00Z"},
            {"event_text": "bob replied", "is_canceled": false, "occurred_at": "2026-03-01T09:05:00Z"},
        ]));

        let payload = provider()
            .generate_message(&item, &webhook_destination("https://hooks.example.com/courier"))
            .await
            .expect("payload");

        assert_eq!(payload["content_source_type"], "ticket");
        assert_eq!(payload["content_source_id"], 42);
        let events = payload["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event_text"], "bob replied");
    }

    #[tokio::test]
    async fn generate_message_rejects_non_http_schemes() {
        let item = item_with_events(serde_json::json!([
            {"event_text": "bob replied", "is_canceled": false, "occurred_at": "2026-03-01T09:05:00Z"},
        ]));

        let result = provider()
            .generate_message(&item, &webhook_destination("ftp://example.com/inbox"))
            .await;
        assert_matches!(result, Err(ProviderError::MessageGeneration(_)));
    }

    #[tokio::test]
    async fn generate_message_rejects_unparseable_urls() {
        let item = item_with_events(serde_json::json!([
            {"event_text": "bob replied", "is_canceled": false, "occurred_at": "2026-03-01T09:05:00Z"},
        ]));

        let result = provider()
            .generate_message(&item, &webhook_destination("not a url"))
            .await;
        assert_matches!(result, Err(ProviderError::MessageGeneration(_)));
    }
}
