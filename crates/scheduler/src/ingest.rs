//! Ingestion path: shape the scheduled backlog from source-domain events.
//!
//! For every incoming notice, events merge into the subscriber's existing
//! scheduled items where one exists, and new items are drafted for any
//! preferred destination not yet covered. Drafting is two-phase: events
//! accumulate into an [`ItemDraft`] and only a draft justified by at least
//! one non-canceled event materializes a row. This path never sends.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use courier_core::draft::{DraftEvent, ItemDraft};
use courier_core::types::{DbId, Timestamp};
use courier_db::models::destination::Destination;
use courier_db::models::item::{NewNotificationItem, NotificationItem};
use courier_db::models::settings::SubscriberSettings;
use courier_db::repositories::{DestinationRepo, NotificationItemRepo, SubscriberSettingsRepo};
use courier_db::DbPool;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for the merge-or-create batch.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

/// One source-domain occurrence to fan out to a subscriber's destinations.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEventNotice {
    pub subscriber_id: String,
    pub content_source_id: DbId,
    /// Content source discriminator, e.g. `"ticket"`.
    pub content_source_type: String,
    /// Human-readable description of the occurrence.
    pub event_text: String,
    /// Pre-canceled by the producer: the subscriber caused the event
    /// themselves and anti-noise suppresses self-notification. Such a
    /// notice still merges into existing items (for the audit log) but
    /// never justifies a new one.
    #[serde(default)]
    pub is_canceled: bool,
}

impl SourceEventNotice {
    fn to_draft_event(&self, occurred_at: Timestamp) -> DraftEvent {
        DraftEvent {
            event_text: self.event_text.clone(),
            is_canceled: self.is_canceled,
            occurred_at,
        }
    }
}

/// Counts of what one ingest batch did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Events appended to already-scheduled items.
    pub merged: usize,
    /// New items persisted.
    pub created: usize,
    /// Drafts discarded for lacking any non-canceled event.
    pub discarded: usize,
}

// ---------------------------------------------------------------------------
// Ingestor
// ---------------------------------------------------------------------------

/// Applies batches of source-domain events to the notification backlog.
pub struct Ingestor {
    pool: DbPool,
}

impl Ingestor {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Merge-or-create the whole batch, returning what happened.
    pub async fn ingest(
        &self,
        batch: Vec<SourceEventNotice>,
    ) -> Result<IngestSummary, IngestError> {
        let batch_id = Uuid::new_v4();
        let mut summary = IngestSummary::default();

        for notice in &batch {
            self.ingest_one(notice, &mut summary).await?;
        }

        tracing::info!(
            %batch_id,
            notices = batch.len(),
            merged = summary.merged,
            created = summary.created,
            discarded = summary.discarded,
            "Ingested notification events"
        );
        Ok(summary)
    }

    async fn ingest_one(
        &self,
        notice: &SourceEventNotice,
        summary: &mut IngestSummary,
    ) -> Result<(), IngestError> {
        let settings =
            SubscriberSettingsRepo::get_or_default(&self.pool, &notice.subscriber_id).await?;
        if !settings.is_enabled {
            tracing::debug!(
                subscriber_id = %notice.subscriber_id,
                "Subscriber notifications disabled, skipping notice"
            );
            return Ok(());
        }

        let occurred_at = Utc::now();
        let event = notice.to_draft_event(occurred_at);

        // Merge into items already scheduled for this source and subscriber.
        let existing = NotificationItemRepo::list_scheduled_for_source(
            &self.pool,
            notice.content_source_id,
            &notice.content_source_type,
            &notice.subscriber_id,
        )
        .await?;
        for item in &existing {
            if NotificationItemRepo::append_event(&self.pool, item.id, &event).await? {
                summary.merged += 1;
            }
        }

        // Draft a new item for every preferred destination not yet covered.
        let destinations =
            DestinationRepo::list_for_subscriber(&self.pool, &notice.subscriber_id).await?;
        for destination in plan_uncovered(&existing, &destinations, &settings) {
            let mut draft = ItemDraft::new(
                notice.content_source_id,
                &notice.content_source_type,
                &notice.subscriber_id,
                destination.id,
            );
            draft.push_event(event.clone());
            match draft.finalize() {
                Some(finalized) => {
                    let input = NewNotificationItem::from_draft(finalized, occurred_at);
                    NotificationItemRepo::create(&self.pool, &input).await?;
                    summary.created += 1;
                }
                None => {
                    summary.discarded += 1;
                }
            }
        }

        Ok(())
    }
}

/// The subscriber's preferred destinations that no existing scheduled item
/// already covers. Existing items absorb new events by merge; only the
/// remainder warrants a fresh draft.
pub fn plan_uncovered<'a>(
    existing: &[NotificationItem],
    candidates: &'a [Destination],
    settings: &SubscriberSettings,
) -> Vec<&'a Destination> {
    candidates
        .iter()
        .filter(|d| settings.wants_destination_type(&d.destination_type))
        .filter(|d| !existing.iter().any(|item| item.destination_id == d.id))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
