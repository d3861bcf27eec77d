//! Repository for the `destinations` table.

use sqlx::PgPool;

use courier_core::types::DbId;

use crate::models::destination::{Destination, NewDestination};

/// Column list for `destinations` queries.
const COLUMNS: &str = "id, subscriber_id, destination_type, address, display_name, created_at";

/// Provides CRUD operations for delivery destinations.
pub struct DestinationRepo;

impl DestinationRepo {
    /// Register a new destination for a subscriber.
    pub async fn create(
        pool: &PgPool,
        input: &NewDestination,
    ) -> Result<Destination, sqlx::Error> {
        let query = format!(
            "INSERT INTO destinations (subscriber_id, destination_type, address, display_name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Destination>(&query)
            .bind(&input.subscriber_id)
            .bind(&input.destination_type)
            .bind(&input.address)
            .bind(&input.display_name)
            .fetch_one(pool)
            .await
    }

    /// Find a destination by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Destination>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM destinations WHERE id = $1");
        sqlx::query_as::<_, Destination>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all destinations registered for a subscriber, oldest first.
    pub async fn list_for_subscriber(
        pool: &PgPool,
        subscriber_id: &str,
    ) -> Result<Vec<Destination>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM destinations \
             WHERE subscriber_id = $1 \
             ORDER BY id"
        );
        sqlx::query_as::<_, Destination>(&query)
            .bind(subscriber_id)
            .fetch_all(pool)
            .await
    }
}
