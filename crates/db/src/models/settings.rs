//! Application and subscriber settings models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use courier_core::retry::RetryPolicy;
use courier_core::types::Timestamp;

/// The process-wide settings singleton (`application_settings` table).
///
/// Lazily created with defaults on first access; see
/// [`ApplicationSettingsRepo::get_or_create`](crate::repositories::ApplicationSettingsRepo::get_or_create).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApplicationSettings {
    pub retry_attempts: i32,
    pub retry_interval_minutes: i32,
    /// Ordered list of [`ProviderDescriptor`]s as stored JSONB.
    pub providers: serde_json::Value,
    pub updated_at: Timestamp,
}

impl ApplicationSettings {
    /// The retry policy the scheduler applies to every attempt.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, i64::from(self.retry_interval_minutes))
    }

    /// Decode the configured provider descriptors, preserving order.
    ///
    /// Malformed entries are dropped with a warning; one bad descriptor must
    /// not take down provider resolution for the rest.
    pub fn provider_descriptors(&self) -> Vec<ProviderDescriptor> {
        match &self.providers {
            serde_json::Value::Array(entries) => entries
                .iter()
                .filter_map(|e| match serde_json::from_value(e.clone()) {
                    Ok(descriptor) => Some(descriptor),
                    Err(err) => {
                        tracing::warn!(error = %err, "Dropping malformed provider descriptor");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// One configured delivery provider: which factory to use and its opaque
/// configuration blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Factory key, e.g. `"email"` or `"webhook"`.
    pub identifier: String,
    pub is_enabled: bool,
    /// Provider-specific configuration, passed verbatim to the factory.
    #[serde(default)]
    pub configuration: serde_json::Value,
}

/// Per-subscriber notification preferences (`subscriber_settings` table).
///
/// Consulted only when *creating* items, never on the send path.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubscriberSettings {
    pub subscriber_id: String,
    pub is_enabled: bool,
    /// JSONB array of destination type names the subscriber wants pushed.
    pub push_destination_types: serde_json::Value,
    pub updated_at: Timestamp,
}

impl SubscriberSettings {
    /// Defaults for a subscriber with no stored row: enabled, but with no
    /// destination types opted in, so nothing is scheduled for them.
    pub fn default_for(subscriber_id: impl Into<String>) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            is_enabled: true,
            push_destination_types: serde_json::json!([]),
            updated_at: chrono::Utc::now(),
        }
    }

    /// Whether the subscriber opted into the given destination type.
    pub fn wants_destination_type(&self, destination_type: &str) -> bool {
        match &self.push_destination_types {
            serde_json::Value::Array(types) => types
                .iter()
                .any(|t| t.as_str() == Some(destination_type)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_providers(providers: serde_json::Value) -> ApplicationSettings {
        ApplicationSettings {
            retry_attempts: 3,
            retry_interval_minutes: 5,
            providers,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn retry_policy_maps_both_fields() {
        let settings = settings_with_providers(serde_json::json!([]));
        let policy = settings.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.interval_minutes, 5);
    }

    #[test]
    fn provider_descriptors_preserve_order_and_default_configuration() {
        let settings = settings_with_providers(serde_json::json!([
            {"identifier": "email", "is_enabled": true, "configuration": {"smtp_host": "mail.example.com"}},
            {"identifier": "webhook", "is_enabled": false},
        ]));
        let descriptors = settings.provider_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].identifier, "email");
        assert_eq!(descriptors[1].identifier, "webhook");
        assert!(!descriptors[1].is_enabled);
        assert!(descriptors[1].configuration.is_null());
    }

    #[test]
    fn malformed_descriptor_is_dropped_not_fatal() {
        let settings = settings_with_providers(serde_json::json!([
            {"identifier": "email", "is_enabled": true},
            {"is_enabled": true},
        ]));
        let descriptors = settings.provider_descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].identifier, "email");
    }

    #[test]
    fn wants_destination_type_checks_the_opt_in_list() {
        let settings = SubscriberSettings {
            subscriber_id: "alice".to_string(),
            is_enabled: true,
            push_destination_types: serde_json::json!(["email"]),
            updated_at: chrono::Utc::now(),
        };
        assert!(settings.wants_destination_type("email"));
        assert!(!settings.wants_destination_type("webhook"));
    }

    #[test]
    fn default_subscriber_settings_want_nothing() {
        let settings = SubscriberSettings::default_for("bob");
        assert!(settings.is_enabled);
        assert!(!settings.wants_destination_type("email"));
    }
}
