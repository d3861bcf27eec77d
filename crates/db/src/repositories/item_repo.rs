//! Repository for the `notification_items` table.
//!
//! Uses `DeliveryStatus` from `courier-core` for all status transitions.
//! The ready-queue selection and every finalizing write are the storage
//! half of the race-safety contract: selection skips rows another worker
//! has in hand (`FOR UPDATE SKIP LOCKED`), and finalization only succeeds
//! while the item is still in a sendable status.

use sqlx::PgPool;

use courier_core::draft::DraftEvent;
use courier_core::status::DeliveryStatus;
use courier_core::types::{DbId, Timestamp};

use crate::models::item::{NewNotificationItem, NotificationItem};

/// Column list for `notification_items` queries.
const COLUMNS: &str = "\
    id, content_source_id, content_source_type, subscriber_id, destination_id, \
    status_id, scheduled_send_date, retry_count, events, created_at, updated_at";

/// Provides CRUD operations for notification items.
pub struct NotificationItemRepo;

impl NotificationItemRepo {
    /// Insert a new scheduled item. Returns the full row.
    pub async fn create(
        pool: &PgPool,
        input: &NewNotificationItem,
    ) -> Result<NotificationItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_items \
                 (content_source_id, content_source_type, subscriber_id, \
                  destination_id, status_id, scheduled_send_date, events) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationItem>(&query)
            .bind(input.content_source_id)
            .bind(&input.content_source_type)
            .bind(&input.subscriber_id)
            .bind(input.destination_id)
            .bind(DeliveryStatus::Scheduled.id())
            .bind(input.scheduled_send_date)
            .bind(&input.events)
            .fetch_one(pool)
            .await
    }

    /// Find an item by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<NotificationItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_items WHERE id = $1");
        sqlx::query_as::<_, NotificationItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically pick the globally earliest item that is due for sending.
    ///
    /// Eligibility: status `Scheduled`/`Retrying` and `scheduled_send_date`
    /// at or before `now`. Ordering is `scheduled_send_date ASC` with `id`
    /// as a deterministic tie-break. `FOR UPDATE SKIP LOCKED` makes
    /// overlapping pollers prefer distinct rows (same shape as a worker
    /// claiming a queued job).
    pub async fn next_ready(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Option<NotificationItem>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_items \
             SET updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM notification_items \
                 WHERE status_id IN ($1, $2) AND scheduled_send_date <= $3 \
                 ORDER BY scheduled_send_date ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationItem>(&query)
            .bind(DeliveryStatus::Scheduled.id())
            .bind(DeliveryStatus::Retrying.id())
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Find the unique sendable item for an exact delivery-obligation tuple.
    ///
    /// Returns `None` when the item was already finalized (sent, abandoned,
    /// not-available) or never created; callers treat that as a no-op.
    pub async fn find_sendable(
        pool: &PgPool,
        content_source_id: DbId,
        content_source_type: &str,
        subscriber_id: &str,
        destination_id: DbId,
    ) -> Result<Option<NotificationItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_items \
             WHERE content_source_id = $1 AND content_source_type = $2 \
               AND subscriber_id = $3 AND destination_id = $4 \
               AND status_id IN ($5, $6)"
        );
        sqlx::query_as::<_, NotificationItem>(&query)
            .bind(content_source_id)
            .bind(content_source_type)
            .bind(subscriber_id)
            .bind(destination_id)
            .bind(DeliveryStatus::Scheduled.id())
            .bind(DeliveryStatus::Retrying.id())
            .fetch_optional(pool)
            .await
    }

    /// List the still-scheduled items for one content source and subscriber
    /// across all destinations. The ingestion path merges new events into
    /// these instead of creating duplicates.
    pub async fn list_scheduled_for_source(
        pool: &PgPool,
        content_source_id: DbId,
        content_source_type: &str,
        subscriber_id: &str,
    ) -> Result<Vec<NotificationItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_items \
             WHERE content_source_id = $1 AND content_source_type = $2 \
               AND subscriber_id = $3 AND status_id = $4 \
             ORDER BY id"
        );
        sqlx::query_as::<_, NotificationItem>(&query)
            .bind(content_source_id)
            .bind(content_source_type)
            .bind(subscriber_id)
            .bind(DeliveryStatus::Scheduled.id())
            .fetch_all(pool)
            .await
    }

    /// Append one event to an item's JSONB log, provided the item is still
    /// scheduled. Returns `false` when the item moved on in the meantime.
    pub async fn append_event(
        pool: &PgPool,
        item_id: DbId,
        event: &DraftEvent,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_items \
             SET events = events || $2::jsonb, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(item_id)
        .bind(serde_json::json!([event]))
        .bind(DeliveryStatus::Scheduled.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist the outcome of a send attempt from the mutated in-memory row.
    ///
    /// The update only succeeds while the stored item is still in a
    /// sendable status; `false` means a concurrent worker finalized it
    /// first and this attempt's transition must be discarded.
    pub async fn finalize_attempt(
        pool: &PgPool,
        item: &NotificationItem,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_items \
             SET status_id = $2, scheduled_send_date = $3, retry_count = $4, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($5, $6)",
        )
        .bind(item.id)
        .bind(item.status_id)
        .bind(item.scheduled_send_date)
        .bind(item.retry_count)
        .bind(DeliveryStatus::Scheduled.id())
        .bind(DeliveryStatus::Retrying.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
