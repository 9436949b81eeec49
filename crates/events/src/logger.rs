//! Background task that mirrors every bus event into the tracing log.

use tokio::sync::broadcast;

use crate::bus::{EventKind, PipelineEvent};
use crate::notification::NotificationSeverity;

pub struct EventLogger;

impl EventLogger {
    /// Log events until the bus is dropped.
    pub async fn run(mut receiver: broadcast::Receiver<PipelineEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::log(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, logger shutting down");
                    break;
                }
            }
        }
    }

    fn log(event: &PipelineEvent) {
        let batch_id = event.batch_id.map(|id| id.to_string()).unwrap_or_default();
        match &event.kind {
            EventKind::Progress(p) => tracing::info!(
                batch_id = %batch_id,
                completed = p.completed,
                total = p.total,
                current = p.current_label.as_deref().unwrap_or(""),
                "Batch progress",
            ),
            EventKind::JobStatusChanged {
                variant_id,
                status,
                failure,
                ..
            } => tracing::debug!(
                batch_id = %batch_id,
                variant_id = %variant_id,
                status = %status,
                failure = failure.map(|f| f.as_str()).unwrap_or(""),
                "Job status changed",
            ),
            EventKind::Notification(n) => match n.severity {
                NotificationSeverity::Error => {
                    tracing::error!(batch_id = %batch_id, title = %n.title, "{}", n.message)
                }
                NotificationSeverity::Warning => {
                    tracing::warn!(batch_id = %batch_id, title = %n.title, "{}", n.message)
                }
                NotificationSeverity::Info => {
                    tracing::info!(batch_id = %batch_id, title = %n.title, "{}", n.message)
                }
            },
            other => tracing::debug!(
                batch_id = %batch_id,
                event_type = other.event_type(),
                "Pipeline event",
            ),
        }
    }
}
