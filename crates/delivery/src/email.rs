//! Email notification delivery via SMTP.
//!
//! [`EmailProvider`] wraps the `lettre` async SMTP transport. It renders a
//! plain-text message from an item's non-canceled event log and sends it to
//! the destination address. Configuration arrives as the opaque blob from
//! the provider descriptor; see [`EmailProviderConfig`] for the accepted
//! fields.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};

use courier_core::destination_types::DEST_EMAIL;
use courier_db::models::destination::Destination;
use courier_db::models::item::NotificationItem;

use crate::provider::{DeliveryProvider, ProviderError};
use crate::registry::ProviderBuildError;

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when the descriptor omits `from_address`.
const DEFAULT_FROM_ADDRESS: &str = "noreply@courier.local";

// ---------------------------------------------------------------------------
// EmailProviderConfig
// ---------------------------------------------------------------------------

/// Configuration blob accepted by the email provider factory.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailProviderConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    #[serde(default = "default_from_address")]
    pub from_address: String,
    /// Optional SMTP username.
    #[serde(default)]
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_from_address() -> String {
    DEFAULT_FROM_ADDRESS.to_string()
}

/// The generated message payload exchanged between `generate_message` and
/// `transmit`.
#[derive(Debug, Serialize, Deserialize)]
struct EmailMessage {
    to: String,
    subject: String,
    body: String,
}

// ---------------------------------------------------------------------------
// EmailProvider
// ---------------------------------------------------------------------------

/// Sends notification emails via SMTP for `"email"` destinations.
#[derive(Debug)]
pub struct EmailProvider {
    config: EmailProviderConfig,
    from: Mailbox,
}

impl EmailProvider {
    /// Construct the provider from its descriptor configuration blob.
    pub fn from_config(config: serde_json::Value) -> Result<Self, ProviderBuildError> {
        let config: EmailProviderConfig = serde_json::from_value(config)
            .map_err(|e| ProviderBuildError::InvalidConfig(e.to_string()))?;
        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|e| ProviderBuildError::InvalidConfig(format!("from_address: {e}")))?;
        Ok(Self { config, from })
    }
}

#[async_trait]
impl DeliveryProvider for EmailProvider {
    fn destination_type(&self) -> &str {
        DEST_EMAIL
    }

    async fn generate_message(
        &self,
        item: &NotificationItem,
        destination: &Destination,
    ) -> Result<serde_json::Value, ProviderError> {
        let to: Mailbox = destination
            .address
            .parse()
            .map_err(|e| ProviderError::MessageGeneration(format!("destination address: {e}")))?;

        let live: Vec<_> = item
            .parsed_events()
            .into_iter()
            .filter(|e| !e.is_canceled)
            .collect();
        if live.is_empty() {
            return Err(ProviderError::MessageGeneration(
                "item has no deliverable events".to_string(),
            ));
        }

        let subject = format!(
            "[Courier] {} #{}: {} new event(s)",
            item.content_source_type,
            item.content_source_id,
            live.len()
        );
        let body = live
            .iter()
            .map(|e| format!("{}: {}", e.occurred_at.to_rfc3339(), e.event_text))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::to_value(EmailMessage {
            to: to.to_string(),
            subject,
            body,
        })
        .map_err(|e| ProviderError::MessageGeneration(e.to_string()))
    }

    async fn transmit(
        &self,
        payload: &serde_json::Value,
        _destination: &Destination,
    ) -> Result<(), ProviderError> {
        let message: EmailMessage = serde_json::from_value(payload.clone())
            .map_err(|e| ProviderError::Transport(format!("payload decode: {e}")))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(message
                .to
                .parse()
                .map_err(|e| ProviderError::Transport(format!("recipient: {e}")))?)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body)
            .map_err(|e| ProviderError::Transport(format!("message build: {e}")))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(|e| ProviderError::Transport(e.to_string()))?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer
            .send(email)
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        tracing::info!(to = %message.to, subject = %message.subject, "Notification email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
