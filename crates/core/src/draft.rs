//! Two-phase builder for new notification items.
//!
//! Ingestion accumulates candidate events into an [`ItemDraft`] and calls
//! [`finalize`](ItemDraft::finalize) once the batch is shaped. A draft only
//! yields a persistable [`FinalizedDraft`] when at least one non-canceled
//! event justifies the notification; a draft whose events all arrived
//! pre-canceled (anti-noise suppression of a subscriber's own actions)
//! yields `None` and no item row is ever materialized.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// One source-domain occurrence justifying a notification.
///
/// Canceled events stay in the log for audit but do not by themselves
/// justify delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftEvent {
    /// Human-readable description of the occurrence.
    pub event_text: String,
    /// Whether the event arrived pre-canceled (e.g. self-notification
    /// suppressed by anti-noise).
    pub is_canceled: bool,
    /// When the occurrence happened (UTC).
    pub occurred_at: Timestamp,
}

/// Accumulates candidate events for one (source, subscriber, destination).
#[derive(Debug, Clone)]
pub struct ItemDraft {
    content_source_id: DbId,
    content_source_type: String,
    subscriber_id: String,
    destination_id: DbId,
    events: Vec<DraftEvent>,
}

/// A draft that passed finalization and may be persisted as a new item.
#[derive(Debug, Clone)]
pub struct FinalizedDraft {
    pub content_source_id: DbId,
    pub content_source_type: String,
    pub subscriber_id: String,
    pub destination_id: DbId,
    /// The full accumulated log, canceled events included, in push order.
    pub events: Vec<DraftEvent>,
}

impl ItemDraft {
    pub fn new(
        content_source_id: DbId,
        content_source_type: impl Into<String>,
        subscriber_id: impl Into<String>,
        destination_id: DbId,
    ) -> Self {
        Self {
            content_source_id,
            content_source_type: content_source_type.into(),
            subscriber_id: subscriber_id.into(),
            destination_id,
            events: Vec::new(),
        }
    }

    /// Append a candidate event. Order is preserved.
    pub fn push_event(&mut self, event: DraftEvent) {
        self.events.push(event);
    }

    /// Number of accumulated events, canceled included.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Yield a persistable draft, or `None` when nothing justifies delivery.
    pub fn finalize(self) -> Option<FinalizedDraft> {
        if !self.events.iter().any(|e| !e.is_canceled) {
            return None;
        }
        Some(FinalizedDraft {
            content_source_id: self.content_source_id,
            content_source_type: self.content_source_type,
            subscriber_id: self.subscriber_id,
            destination_id: self.destination_id,
            events: self.events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(text: &str, is_canceled: bool) -> DraftEvent {
        DraftEvent {
            event_text: text.to_string(),
            is_canceled,
            occurred_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_draft_finalizes_to_none() {
        let draft = ItemDraft::new(10, "ticket", "alice", 1);
        assert!(draft.finalize().is_none());
    }

    #[test]
    fn all_canceled_draft_finalizes_to_none() {
        let mut draft = ItemDraft::new(10, "ticket", "alice", 1);
        draft.push_event(event("alice commented", true));
        draft.push_event(event("alice edited", true));
        assert!(draft.finalize().is_none());
    }

    #[test]
    fn one_live_event_is_enough() {
        let mut draft = ItemDraft::new(10, "ticket", "alice", 1);
        draft.push_event(event("bob commented", false));
        let finalized = draft.finalize().expect("justified draft");
        assert_eq!(finalized.content_source_id, 10);
        assert_eq!(finalized.content_source_type, "ticket");
        assert_eq!(finalized.subscriber_id, "alice");
        assert_eq!(finalized.destination_id, 1);
    }

    #[test]
    fn canceled_events_are_retained_in_the_finalized_log() {
        let mut draft = ItemDraft::new(10, "ticket", "alice", 1);
        draft.push_event(event("alice commented", true));
        draft.push_event(event("bob replied", false));
        let finalized = draft.finalize().expect("justified draft");
        assert_eq!(finalized.events.len(), 2);
        assert!(finalized.events[0].is_canceled);
    }

    #[test]
    fn event_order_is_preserved() {
        let mut draft = ItemDraft::new(10, "ticket", "alice", 1);
        for i in 0..4 {
            draft.push_event(event(&format!("event {i}"), false));
        }
        let finalized = draft.finalize().expect("justified draft");
        let texts: Vec<_> = finalized.events.iter().map(|e| e.event_text.as_str()).collect();
        assert_eq!(texts, ["event 0", "event 1", "event 2", "event 3"]);
    }
}
