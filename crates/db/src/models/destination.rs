//! Destination entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use courier_core::types::{DbId, Timestamp};

/// A row from the `destinations` table: one delivery target for one
/// subscriber.
///
/// `address` is opaque to the scheduler; its interpretation belongs to the
/// provider resolved for `destination_type` (a mailbox for "email", a URL
/// for "webhook").
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Destination {
    pub id: DbId,
    pub subscriber_id: String,
    pub destination_type: String,
    pub address: String,
    pub display_name: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for registering a new destination.
#[derive(Debug, Deserialize)]
pub struct NewDestination {
    pub subscriber_id: String,
    pub destination_type: String,
    pub address: String,
    pub display_name: Option<String>,
}
