//! Notification item entity model.

use serde::Serialize;
use sqlx::FromRow;

use courier_core::draft::{DraftEvent, FinalizedDraft};
use courier_core::status::{DeliveryStatus, StatusId};
use courier_core::transition::Transition;
use courier_core::types::{DbId, Timestamp};

/// A row from the `notification_items` table: one delivery obligation per
/// (content source, subscriber, destination).
///
/// `events` is the append-only JSONB log of [`DraftEvent`]s justifying the
/// notification. Rows are never deleted; terminal statuses preserve the log
/// as an audit trail.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationItem {
    pub id: DbId,
    pub content_source_id: DbId,
    pub content_source_type: String,
    pub subscriber_id: String,
    pub destination_id: DbId,
    pub status_id: StatusId,
    pub scheduled_send_date: Option<Timestamp>,
    pub retry_count: i32,
    pub events: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationItem {
    /// Decode the `status_id` column. `None` for ids the schema seed does
    /// not know, which would indicate a corrupted row.
    pub fn status(&self) -> Option<DeliveryStatus> {
        DeliveryStatus::from_id(self.status_id)
    }

    /// Decode the JSONB event log.
    ///
    /// Malformed entries are dropped rather than failing the whole item:
    /// a provider can still render a message from the remaining events.
    pub fn parsed_events(&self) -> Vec<DraftEvent> {
        match &self.events {
            serde_json::Value::Array(entries) => entries
                .iter()
                .filter_map(|e| serde_json::from_value(e.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Apply a state-machine transition to the in-memory row.
    ///
    /// Persistence is separate; see
    /// [`NotificationItemRepo::finalize_attempt`](crate::repositories::NotificationItemRepo::finalize_attempt).
    pub fn apply(&mut self, transition: &Transition) {
        self.status_id = transition.status.id();
        self.scheduled_send_date = transition.scheduled_send_date;
        self.retry_count = transition.retry_count;
    }
}

/// DTO for inserting a new item produced by the ingestion path.
#[derive(Debug, Clone)]
pub struct NewNotificationItem {
    pub content_source_id: DbId,
    pub content_source_type: String,
    pub subscriber_id: String,
    pub destination_id: DbId,
    pub scheduled_send_date: Timestamp,
    pub events: serde_json::Value,
}

impl NewNotificationItem {
    /// Build the insert DTO from a finalized draft, scheduling the first
    /// attempt at `send_at`.
    pub fn from_draft(draft: FinalizedDraft, send_at: Timestamp) -> Self {
        Self {
            content_source_id: draft.content_source_id,
            content_source_type: draft.content_source_type,
            subscriber_id: draft.subscriber_id,
            destination_id: draft.destination_id,
            scheduled_send_date: send_at,
            events: serde_json::json!(draft.events),
        }
    }
}
