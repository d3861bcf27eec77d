//! Well-known destination type name constants.
//!
//! These must match the values stored in the `destinations.destination_type`
//! column and the `destination_type()` declared by each delivery provider.
//! Additional types may exist at runtime (routing is purely string-keyed),
//! but the bundled providers cover these two.

/// Email destination delivered via SMTP.
pub const DEST_EMAIL: &str = "email";

/// Webhook destination delivered via HTTP POST.
pub const DEST_WEBHOOK: &str = "webhook";
