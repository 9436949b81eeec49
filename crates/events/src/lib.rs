//! Typed event bus shared by the generation and preview pipelines.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PipelineEvent`]: the event envelope carrying an [`EventKind`].
//! - [`Notification`]: user-facing messages raised by a batch.
//! - [`CandidateIntent`]: requests handed to the diagram editing surface.
//! - [`EventLogger`]: background task that logs every event.

pub mod bus;
pub mod intent;
pub mod logger;
pub mod notification;

pub use bus::{EventBus, EventKind, PipelineEvent, Progress};
pub use intent::{CandidateIntent, ExportFormat};
pub use logger::EventLogger;
pub use notification::{Notification, NotificationSeverity};
