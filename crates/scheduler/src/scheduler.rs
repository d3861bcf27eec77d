//! The delivery scheduler: one send attempt per invocation.
//!
//! Each public operation is an independent unit of work against shared
//! storage and may overlap with other invocations (multiple workers
//! draining the same backlog). Race-safety rests on the repository's
//! conditional writes: the ready-queue pick skips rows another worker
//! holds, and the finalizing update only lands while the item is still
//! sendable. The residual window between a successful transmit and the
//! finalizing write is the documented at-least-once risk; providers must
//! tolerate a duplicate transmission after a crash there.

use std::sync::Arc;

use chrono::Utc;

use courier_core::status::DeliveryStatus;
use courier_core::transition;
use courier_core::types::DbId;
use courier_db::models::item::NotificationItem;
use courier_db::repositories::{ApplicationSettingsRepo, DestinationRepo, NotificationItemRepo};
use courier_db::DbPool;
use courier_delivery::ProviderRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for scheduler operations.
///
/// Per-item delivery failures never surface here; they are encoded into
/// item status. Only infrastructure faults propagate, since no item-level
/// invariant can be preserved without storage.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// SendReport
// ---------------------------------------------------------------------------

/// What one scheduler pass did to the item it picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendReport {
    /// Delivered; the item is terminal.
    Sent,
    /// The attempt failed; the item is rescheduled for retry.
    Rescheduled,
    /// The retry budget is exhausted; the item is terminal.
    Abandoned,
    /// No enabled provider matches the destination type; terminal.
    NotAvailable,
}

impl SendReport {
    fn for_item(item: &NotificationItem) -> Self {
        match item.status() {
            Some(DeliveryStatus::Sent) => Self::Sent,
            Some(DeliveryStatus::Abandoned) => Self::Abandoned,
            Some(DeliveryStatus::NotAvailable) => Self::NotAvailable,
            // Retrying, or anything unexpected: the item stays in the
            // backlog and a later poll picks it up again.
            _ => Self::Rescheduled,
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryScheduler
// ---------------------------------------------------------------------------

/// Orchestrates send attempts over the scheduled backlog.
pub struct DeliveryScheduler {
    pool: DbPool,
    registry: Arc<ProviderRegistry>,
}

impl DeliveryScheduler {
    /// Create a scheduler over the given pool and provider registry.
    pub fn new(pool: DbPool, registry: Arc<ProviderRegistry>) -> Self {
        Self { pool, registry }
    }

    /// Send the globally earliest item that is due, if any.
    ///
    /// Eligibility and ordering are owned by the repository query: status
    /// `Scheduled`/`Retrying`, `scheduled_send_date <= now`, earliest date
    /// first with item id as tie-break. Returns `Ok(None)` when nothing is
    /// due: no state change, no provider call.
    pub async fn send_next_ready(&self) -> Result<Option<SendReport>, SchedulerError> {
        let Some(item) = NotificationItemRepo::next_ready(&self.pool, Utc::now()).await? else {
            return Ok(None);
        };
        self.attempt(item).await.map(Some)
    }

    /// Send the unique sendable item for an exact delivery-obligation
    /// tuple, regardless of its scheduled date.
    ///
    /// Returns `Ok(None)` when no such item exists (already sent, not yet
    /// created, or terminal). Calling this on an already-sent item is a
    /// no-op by construction.
    pub async fn send_specific(
        &self,
        content_source_id: DbId,
        content_source_type: &str,
        subscriber_id: &str,
        destination_id: DbId,
    ) -> Result<Option<SendReport>, SchedulerError> {
        let found = NotificationItemRepo::find_sendable(
            &self.pool,
            content_source_id,
            content_source_type,
            subscriber_id,
            destination_id,
        )
        .await?;
        let Some(item) = found else {
            tracing::debug!(
                content_source_id,
                content_source_type,
                subscriber_id,
                destination_id,
                "No sendable item for tuple, nothing to do"
            );
            return Ok(None);
        };
        self.attempt(item).await.map(Some)
    }

    /// Run one send attempt for a picked item and persist the transition.
    async fn attempt(&self, mut item: NotificationItem) -> Result<SendReport, SchedulerError> {
        // Resolved fresh each call so configuration changes take effect
        // without a restart.
        let settings = ApplicationSettingsRepo::get_or_create(&self.pool).await?;
        let policy = settings.retry_policy();

        match DestinationRepo::find_by_id(&self.pool, item.destination_id).await? {
            None => {
                tracing::warn!(
                    item_id = item.id,
                    destination_id = item.destination_id,
                    "Destination row missing, marking item not available"
                );
                item.apply(&transition::no_provider(item.retry_count));
            }
            Some(destination) => match self.registry.resolve(&destination.destination_type) {
                None => {
                    tracing::info!(
                        item_id = item.id,
                        destination_type = %destination.destination_type,
                        "No enabled provider for destination type"
                    );
                    item.apply(&transition::no_provider(item.retry_count));
                }
                Some(provider) => {
                    provider.send_ready(&mut item, &destination, &policy).await;
                }
            },
        }

        let persisted = NotificationItemRepo::finalize_attempt(&self.pool, &item).await?;
        if !persisted {
            tracing::warn!(
                item_id = item.id,
                "Item was finalized by a concurrent worker, discarding this attempt's transition"
            );
        }

        Ok(SendReport::for_item(&item))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
