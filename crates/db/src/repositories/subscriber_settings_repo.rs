//! Repository for the `subscriber_settings` table.

use sqlx::PgPool;

use crate::models::settings::SubscriberSettings;

/// Column list for `subscriber_settings` queries.
const COLUMNS: &str = "subscriber_id, is_enabled, push_destination_types, updated_at";

/// Provides access to per-subscriber notification preferences.
pub struct SubscriberSettingsRepo;

impl SubscriberSettingsRepo {
    /// Fetch a subscriber's preferences, falling back to defaults when no
    /// row exists (enabled, nothing opted in).
    pub async fn get_or_default(
        pool: &PgPool,
        subscriber_id: &str,
    ) -> Result<SubscriberSettings, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscriber_settings WHERE subscriber_id = $1");
        let stored = sqlx::query_as::<_, SubscriberSettings>(&query)
            .bind(subscriber_id)
            .fetch_optional(pool)
            .await?;
        Ok(stored.unwrap_or_else(|| SubscriberSettings::default_for(subscriber_id)))
    }

    /// Insert or update a subscriber's preferences in one round-trip.
    pub async fn upsert(
        pool: &PgPool,
        subscriber_id: &str,
        is_enabled: bool,
        push_destination_types: &serde_json::Value,
    ) -> Result<SubscriberSettings, sqlx::Error> {
        let query = format!(
            "INSERT INTO subscriber_settings \
                (subscriber_id, is_enabled, push_destination_types) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (subscriber_id) DO UPDATE SET \
                is_enabled = EXCLUDED.is_enabled, \
                push_destination_types = EXCLUDED.push_destination_types, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubscriberSettings>(&query)
            .bind(subscriber_id)
            .bind(is_enabled)
            .bind(push_destination_types)
            .fetch_one(pool)
            .await
    }
}
