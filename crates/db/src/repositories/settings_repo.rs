//! Repository for the `application_settings` singleton.

use sqlx::PgPool;

use crate::models::settings::ApplicationSettings;

/// Column list for `application_settings` queries.
const COLUMNS: &str = "retry_attempts, retry_interval_minutes, providers, updated_at";

/// Provides access to the process-wide settings row.
pub struct ApplicationSettingsRepo;

impl ApplicationSettingsRepo {
    /// Fetch the settings singleton, creating it with schema defaults on
    /// first access.
    ///
    /// The insert races benignly under concurrent first access: `ON
    /// CONFLICT DO NOTHING` lets exactly one caller create the row and
    /// everyone reads the same result.
    pub async fn get_or_create(pool: &PgPool) -> Result<ApplicationSettings, sqlx::Error> {
        sqlx::query("INSERT INTO application_settings (id) VALUES (TRUE) ON CONFLICT (id) DO NOTHING")
            .execute(pool)
            .await?;

        let query = format!("SELECT {COLUMNS} FROM application_settings WHERE id = TRUE");
        sqlx::query_as::<_, ApplicationSettings>(&query)
            .fetch_one(pool)
            .await
    }

    /// Replace the retry policy fields.
    pub async fn update_retry_policy(
        pool: &PgPool,
        retry_attempts: i32,
        retry_interval_minutes: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE application_settings \
             SET retry_attempts = $1, retry_interval_minutes = $2, updated_at = NOW() \
             WHERE id = TRUE",
        )
        .bind(retry_attempts)
        .bind(retry_interval_minutes)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace the ordered provider descriptor list.
    pub async fn update_providers(
        pool: &PgPool,
        providers: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE application_settings \
             SET providers = $1, updated_at = NOW() \
             WHERE id = TRUE",
        )
        .bind(providers)
        .execute(pool)
        .await?;
        Ok(())
    }
}
