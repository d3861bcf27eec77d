//! Delivery backends for courier notifications.
//!
//! This crate provides the pluggable-provider half of the engine:
//!
//! - [`DeliveryProvider`] — the capability contract each backend
//!   implements (message generation + transport + the shared
//!   send-with-retry bookkeeping).
//! - [`ProviderRegistry`] — resolves a provider for a destination type,
//!   built once at startup from the application settings descriptors and
//!   a compile-time factory map.
//! - [`email`] / [`webhook`] — the bundled SMTP and HTTP POST providers.

pub mod email;
pub mod provider;
pub mod registry;
pub mod webhook;

pub use email::EmailProvider;
pub use provider::{DeliveryProvider, ProviderError};
pub use registry::{ProviderBuildError, ProviderFactories, ProviderRegistry};
pub use webhook::WebhookProvider;

use courier_core::destination_types::{DEST_EMAIL, DEST_WEBHOOK};

/// The factory map for the providers bundled with courier, keyed by the
/// identifiers application settings descriptors use.
pub fn standard_factories() -> ProviderFactories {
    ProviderFactories::new()
        .register(DEST_EMAIL, |config| {
            EmailProvider::from_config(config).map(|p| Box::new(p) as Box<dyn DeliveryProvider>)
        })
        .register(DEST_WEBHOOK, |config| {
            WebhookProvider::from_config(config).map(|p| Box::new(p) as Box<dyn DeliveryProvider>)
        })
}
