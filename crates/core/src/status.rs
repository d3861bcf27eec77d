//! Delivery status enum mapping to the SMALLINT `status_id` column.
//!
//! The variant discriminants match the seed data order (1-based) in the
//! `delivery_statuses` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a raw database status ID back to the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                $(
                    if id == $val {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Notification item delivery status.
    DeliveryStatus {
        /// Awaiting its first send attempt.
        Scheduled = 1,
        /// A send attempt failed; rescheduled for a later retry.
        Retrying = 2,
        /// Delivered successfully. Terminal.
        Sent = 3,
        /// No enabled provider matches the destination type. Terminal.
        NotAvailable = 4,
        /// The retry budget is exhausted. Terminal.
        Abandoned = 5,
    }
}

/// Statuses eligible for a send attempt, in seed order.
pub const SENDABLE_STATUSES: [DeliveryStatus; 2] =
    [DeliveryStatus::Scheduled, DeliveryStatus::Retrying];

impl DeliveryStatus {
    /// Whether an item in this status may still be picked up for sending.
    pub fn is_sendable(self) -> bool {
        SENDABLE_STATUSES.contains(&self)
    }

    /// Whether this status ends the item's lifecycle.
    ///
    /// Terminal items keep their event log for audit but are never selected
    /// by the scheduler again, and their `scheduled_send_date` is null.
    pub fn is_terminal(self) -> bool {
        !self.is_sendable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ids_match_seed_data() {
        assert_eq!(DeliveryStatus::Scheduled.id(), 1);
        assert_eq!(DeliveryStatus::Retrying.id(), 2);
        assert_eq!(DeliveryStatus::Sent.id(), 3);
        assert_eq!(DeliveryStatus::NotAvailable.id(), 4);
        assert_eq!(DeliveryStatus::Abandoned.id(), 5);
    }

    #[test]
    fn from_id_round_trips_known_ids() {
        for id in 1..=5 {
            let status = DeliveryStatus::from_id(id).expect("known id");
            assert_eq!(status.id(), id);
        }
    }

    #[test]
    fn from_id_rejects_unknown_ids() {
        assert_eq!(DeliveryStatus::from_id(0), None);
        assert_eq!(DeliveryStatus::from_id(6), None);
    }

    #[test]
    fn sendable_and_terminal_partition_the_statuses() {
        assert!(DeliveryStatus::Scheduled.is_sendable());
        assert!(DeliveryStatus::Retrying.is_sendable());
        assert!(DeliveryStatus::Sent.is_terminal());
        assert!(DeliveryStatus::NotAvailable.is_terminal());
        assert!(DeliveryStatus::Abandoned.is_terminal());
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = DeliveryStatus::Scheduled.into();
        assert_eq!(id, 1);
    }
}
