//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PipelineEvent`]s. Share it
//! via `Arc<EventBus>`; consumers subscribe rather than registering callbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;
use variantflow_core::candidate::{GenerationFailureKind, JobStatus};

use crate::intent::CandidateIntent;
use crate::notification::Notification;

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// Batch progress after a job settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Jobs settled so far (successes and failures).
    pub completed: u32,
    pub total: u32,
    /// Label of the job that just settled, if any.
    pub current_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Progress(Progress),
    JobStatusChanged {
        variant_id: String,
        label: String,
        status: JobStatus,
        failure: Option<GenerationFailureKind>,
    },
    CandidateReady {
        candidate_id: String,
        variant_id: String,
    },
    PreviewReady {
        candidate_id: String,
        /// Name of the render tier that produced the image.
        tier: String,
        degraded: bool,
    },
    Notification(Notification),
    Intent { intent: CandidateIntent },
}

impl EventKind {
    /// Dot-separated event name, e.g. `"batch.progress"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            EventKind::Progress(_) => "batch.progress",
            EventKind::JobStatusChanged { .. } => "job.status_changed",
            EventKind::CandidateReady { .. } => "candidate.ready",
            EventKind::PreviewReady { .. } => "preview.ready",
            EventKind::Notification(_) => "notification",
            EventKind::Intent { .. } => "candidate.intent",
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// An event raised by a batch or a preview render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Batch the event belongs to, when raised inside one.
    pub batch_id: Option<Uuid>,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            batch_id: None,
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn with_batch(mut self, batch_id: Uuid) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// When the buffer is full the oldest unconsumed events are dropped and slow
/// receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is listening.
    pub fn publish(&self, event: PipelineEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn emit(&self, kind: EventKind) {
        self.publish(PipelineEvent::new(kind));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
