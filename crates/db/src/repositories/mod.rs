//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Status transitions go
//! through conditional updates so concurrent scheduler invocations cannot
//! double-finalize an item.

pub mod destination_repo;
pub mod item_repo;
pub mod settings_repo;
pub mod subscriber_settings_repo;

pub use destination_repo::DestinationRepo;
pub use item_repo::NotificationItemRepo;
pub use settings_repo::ApplicationSettingsRepo;
pub use subscriber_settings_repo::SubscriberSettingsRepo;
