//! Provider registry: destination-type routing over configured providers.
//!
//! Provider construction is static: the host registers a factory per
//! provider identifier at startup ([`ProviderFactories`]), and the
//! application settings descriptors select which factories run and with
//! what configuration. There is no runtime type lookup and no global
//! provider cache: the built [`ProviderRegistry`] is an explicitly owned
//! value the host passes (by `Arc`) into the scheduler, and is only
//! rebuilt by the host itself (process restart or explicit reload).

use courier_db::models::settings::ProviderDescriptor;

use crate::provider::DeliveryProvider;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for provider construction failures.
///
/// Surfaces at registry build time as a warning; the descriptor is dropped
/// and items routed to its destination type fall through to the
/// no-provider terminal transition rather than crashing the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum ProviderBuildError {
    /// The configuration blob did not match the provider's expectations.
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// ProviderFactories
// ---------------------------------------------------------------------------

/// Constructs one provider instance from its opaque configuration blob.
pub type ProviderFactory =
    fn(serde_json::Value) -> Result<Box<dyn DeliveryProvider>, ProviderBuildError>;

/// Compile-time map from provider identifier to factory, in registration
/// order.
#[derive(Default)]
pub struct ProviderFactories {
    entries: Vec<(String, ProviderFactory)>,
}

impl ProviderFactories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under an identifier. Builder-style.
    pub fn register(mut self, identifier: impl Into<String>, factory: ProviderFactory) -> Self {
        self.entries.push((identifier.into(), factory));
        self
    }

    fn get(&self, identifier: &str) -> Option<ProviderFactory> {
        self.entries
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, factory)| *factory)
    }
}

// ---------------------------------------------------------------------------
// ProviderRegistry
// ---------------------------------------------------------------------------

/// The set of usable delivery providers, keyed by destination type.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn DeliveryProvider>>,
}

impl ProviderRegistry {
    /// Instantiate every enabled descriptor through its registered factory.
    ///
    /// Descriptors that are disabled, name an unknown identifier, or whose
    /// factory fails are skipped with a warning; registry build never
    /// fails outright.
    pub fn build(descriptors: &[ProviderDescriptor], factories: &ProviderFactories) -> Self {
        let mut providers: Vec<Box<dyn DeliveryProvider>> = Vec::new();

        for descriptor in descriptors {
            if !descriptor.is_enabled {
                tracing::debug!(identifier = %descriptor.identifier, "Provider disabled, skipping");
                continue;
            }
            let Some(factory) = factories.get(&descriptor.identifier) else {
                tracing::warn!(
                    identifier = %descriptor.identifier,
                    "No factory registered for provider identifier, skipping"
                );
                continue;
            };
            match factory(descriptor.configuration.clone()) {
                Ok(provider) => {
                    tracing::info!(
                        identifier = %descriptor.identifier,
                        destination_type = provider.destination_type(),
                        "Delivery provider registered"
                    );
                    providers.push(provider);
                }
                Err(err) => {
                    tracing::warn!(
                        identifier = %descriptor.identifier,
                        error = %err,
                        "Provider construction failed, dropping from registry"
                    );
                }
            }
        }

        Self { providers }
    }

    /// Resolve the provider for a destination type.
    ///
    /// When multiple enabled providers declare the same type, the first
    /// registered wins; descriptor order in the settings is authoritative.
    pub fn resolve(&self, destination_type: &str) -> Option<&dyn DeliveryProvider> {
        self.providers
            .iter()
            .find(|p| p.destination_type() == destination_type)
            .map(|boxed| boxed.as_ref())
    }

    /// Number of usable providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::provider::ProviderError;
    use courier_db::models::destination::Destination;
    use courier_db::models::item::NotificationItem;

    struct StubProvider {
        destination_type: String,
        label: String,
    }

    #[async_trait]
    impl DeliveryProvider for StubProvider {
        fn destination_type(&self) -> &str {
            &self.destination_type
        }

        async fn generate_message(
            &self,
            _item: &NotificationItem,
            _destination: &Destination,
        ) -> Result<serde_json::Value, ProviderError> {
            Ok(serde_json::json!({"label": self.label}))
        }

        async fn transmit(
            &self,
            _payload: &serde_json::Value,
            _destination: &Destination,
        ) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn stub_factory(config: serde_json::Value) -> Result<Box<dyn DeliveryProvider>, ProviderBuildError> {
        Ok(Box::new(StubProvider {
            destination_type: config["destination_type"]
                .as_str()
                .unwrap_or("stub")
                .to_string(),
            label: config["label"].as_str().unwrap_or("").to_string(),
        }))
    }

    fn failing_factory(
        _config: serde_json::Value,
    ) -> Result<Box<dyn DeliveryProvider>, ProviderBuildError> {
        Err(ProviderBuildError::InvalidConfig("missing host".to_string()))
    }

    fn descriptor(identifier: &str, is_enabled: bool, config: serde_json::Value) -> ProviderDescriptor {
        ProviderDescriptor {
            identifier: identifier.to_string(),
            is_enabled,
            configuration: config,
        }
    }

    fn factories() -> ProviderFactories {
        ProviderFactories::new()
            .register("stub", stub_factory)
            .register("broken", failing_factory)
    }

    #[test]
    fn enabled_descriptors_become_providers() {
        let registry = ProviderRegistry::build(
            &[descriptor("stub", true, serde_json::json!({"destination_type": "email"}))],
            &factories(),
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("email").is_some());
    }

    #[test]
    fn disabled_descriptors_are_skipped() {
        let registry = ProviderRegistry::build(
            &[descriptor("stub", false, serde_json::json!({"destination_type": "email"}))],
            &factories(),
        );
        assert!(registry.is_empty());
        assert!(registry.resolve("email").is_none());
    }

    #[test]
    fn unknown_identifier_is_dropped() {
        let registry = ProviderRegistry::build(
            &[descriptor("nonexistent", true, serde_json::json!({}))],
            &factories(),
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn failed_construction_degrades_to_missing_provider() {
        let registry = ProviderRegistry::build(
            &[
                descriptor("broken", true, serde_json::json!({})),
                descriptor("stub", true, serde_json::json!({"destination_type": "email"})),
            ],
            &factories(),
        );
        // The broken provider is gone; the good one still resolves.
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("email").is_some());
    }

    #[tokio::test]
    async fn first_registered_provider_wins_for_a_shared_type() {
        let registry = ProviderRegistry::build(
            &[
                descriptor(
                    "stub",
                    true,
                    serde_json::json!({"destination_type": "email", "label": "first"}),
                ),
                descriptor(
                    "stub",
                    true,
                    serde_json::json!({"destination_type": "email", "label": "second"}),
                ),
            ],
            &factories(),
        );
        assert_eq!(registry.len(), 2);

        let provider = registry.resolve("email").expect("provider for email");
        let item = placeholder_item();
        let dest = placeholder_destination();
        let payload = provider.generate_message(&item, &dest).await.unwrap();
        assert_eq!(payload["label"], "first");
    }

    #[test]
    fn resolve_miss_returns_none() {
        let registry = ProviderRegistry::build(
            &[descriptor("stub", true, serde_json::json!({"destination_type": "email"}))],
            &factories(),
        );
        assert!(registry.resolve("sms").is_none());
    }

    fn placeholder_item() -> NotificationItem {
        use courier_core::status::DeliveryStatus;
        let now = chrono::Utc::now();
        NotificationItem {
            id: 1,
            content_source_id: 1,
            content_source_type: "ticket".to_string(),
            subscriber_id: "alice".to_string(),
            destination_id: 1,
            status_id: DeliveryStatus::Scheduled.id(),
            scheduled_send_date: Some(now),
            retry_count: 0,
            events: serde_json::json!([]),
            created_at: now,
            updated_at: now,
        }
    }

    fn placeholder_destination() -> Destination {
        Destination {
            id: 1,
            subscriber_id: "alice".to_string(),
            destination_type: "email".to_string(),
            address: "alice@example.com".to_string(),
            display_name: None,
            created_at: chrono::Utc::now(),
        }
    }
}
