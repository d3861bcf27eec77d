//! Courier delivery orchestration.
//!
//! Two entry points shape and drain the notification backlog:
//!
//! - [`Ingestor`] — merges incoming source-domain events into existing
//!   scheduled items or creates new ones per subscriber preference.
//! - [`DeliveryScheduler`] — picks due items, routes them to a provider,
//!   and persists the resulting state transition. One item per call; the
//!   host trigger loops.

pub mod ingest;
pub mod scheduler;

pub use ingest::{IngestError, IngestSummary, Ingestor, SourceEventNotice};
pub use scheduler::{DeliveryScheduler, SchedulerError, SendReport};
