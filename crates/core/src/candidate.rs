//! Candidate records, per-variant job lifecycle, and selection state.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::VariantDescriptor;
use crate::error::CoreError;
use crate::metrics::StructuralMetrics;
use crate::tier::ComplexityTier;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// GeneratedCandidate
// ---------------------------------------------------------------------------

/// One successfully generated alternative diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCandidate {
    /// `{variant_id}-{batch suffix}`; unique within a batch.
    pub id: String,
    pub variant_id: String,
    pub title: String,
    pub description: String,
    /// The tier the variant requested. Never replaced by an inferred tier.
    pub complexity_tier: ComplexityTier,
    pub payload: String,
    pub metrics: StructuralMetrics,
    pub generated_at: Timestamp,
    #[serde(default)]
    pub preview_failed: bool,
}

impl GeneratedCandidate {
    pub fn new(
        variant: &VariantDescriptor,
        batch_suffix: &str,
        payload: String,
        metrics: StructuralMetrics,
        generated_at: Timestamp,
    ) -> Self {
        Self {
            id: format!("{}-{batch_suffix}", variant.id),
            variant_id: variant.id.to_string(),
            title: variant.title.to_string(),
            description: variant.description.to_string(),
            complexity_tier: variant.complexity_tier,
            payload,
            metrics,
            generated_at,
            preview_failed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Job lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Generating,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Generating => "generating",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a generation job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationFailureKind {
    Timeout,
    RateLimited,
    MalformedResponse,
    TransportError,
    Cancelled,
}

impl GenerationFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationFailureKind::Timeout => "timeout",
            GenerationFailureKind::RateLimited => "rate_limited",
            GenerationFailureKind::MalformedResponse => "malformed_response",
            GenerationFailureKind::TransportError => "transport_error",
            GenerationFailureKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for GenerationFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one variant through `queued -> generating -> completed | failed`.
///
/// Transitions are monotonic. `queued -> failed` is allowed for jobs
/// cancelled before they started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationJob {
    pub variant_id: String,
    pub label: String,
    pub status: JobStatus,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub timeout_budget: Duration,
    pub failure: Option<GenerationFailureKind>,
}

impl GenerationJob {
    pub fn new(variant: &VariantDescriptor, timeout_budget: Duration) -> Self {
        Self {
            variant_id: variant.id.to_string(),
            label: variant.title.to_string(),
            status: JobStatus::Queued,
            started_at: None,
            finished_at: None,
            timeout_budget,
            failure: None,
        }
    }

    pub fn start(&mut self, now: Timestamp) -> Result<(), CoreError> {
        self.transition(JobStatus::Generating)?;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn complete(&mut self, now: Timestamp) -> Result<(), CoreError> {
        self.transition(JobStatus::Completed)?;
        self.finished_at = Some(now);
        Ok(())
    }

    pub fn fail(&mut self, kind: GenerationFailureKind, now: Timestamp) -> Result<(), CoreError> {
        self.transition(JobStatus::Failed)?;
        self.failure = Some(kind);
        self.finished_at = Some(now);
        Ok(())
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), CoreError> {
        let allowed = matches!(
            (self.status, to),
            (JobStatus::Queued, JobStatus::Generating)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Generating, JobStatus::Completed)
                | (JobStatus::Generating, JobStatus::Failed)
        );
        if !allowed {
            return Err(CoreError::Conflict(format!(
                "Job '{}' cannot move from {} to {}",
                self.variant_id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The currently selected candidate.
///
/// Either `None` (for an empty list) or the id of a candidate in the list it
/// was last reconciled with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSelection {
    selected: Option<String>,
}

impl CandidateSelection {
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select `id`, which must be present in `candidates`.
    pub fn select(&mut self, id: &str, candidates: &[GeneratedCandidate]) -> Result<(), CoreError> {
        if !candidates.iter().any(|c| c.id == id) {
            return Err(CoreError::Validation(format!(
                "Candidate '{id}' is not in the current list"
            )));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }

    /// Re-establish the invariant against a new list. Keeps the selection if
    /// the id survives, otherwise falls back to the first candidate.
    pub fn reconcile(&mut self, candidates: &[GeneratedCandidate]) {
        let still_present = self
            .selected
            .as_deref()
            .is_some_and(|id| candidates.iter().any(|c| c.id == id));
        if !still_present {
            self.selected = candidates.first().map(|c| c.id.clone());
        }
    }
}
