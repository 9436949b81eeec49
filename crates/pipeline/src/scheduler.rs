//! Candidate scheduler.
//!
//! One batch is one source diagram turned into `N` alternatives. Every
//! variant gets its own generation task on a [`JoinSet`]; results come back
//! to a single loop that owns all batch state, so nothing is shared between
//! tasks. Each settle updates the job, publishes progress and writes the
//! partial candidate list through the [`BestEffortCache`].
//!
//! Notification policy: a failure raises a user notification only when it
//! was rate limited or when it was the last job to settle. Everything else is
//! folded into one aggregate warning at the end of the batch.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use variantflow_core::candidate::{
    GeneratedCandidate, GenerationFailureKind, GenerationJob, JobStatus,
};
use variantflow_core::catalog::{find_variant, select_variants, TierDistribution, VariantDescriptor};
use variantflow_core::error::CoreError;
use variantflow_core::generation_cache::{CacheEntry, CacheKey, GenerationStore, RecordedFailure};
use variantflow_core::metrics::extract_metrics;
use variantflow_core::tier::DiagramType;
use variantflow_core::types::OwnerId;
use variantflow_core::validation::{validate_candidate, ValidationReport};
use variantflow_events::{EventBus, EventKind, Notification, PipelineEvent, Progress};
use variantflow_generation::prompt::summarize_source;
use variantflow_generation::{GenerationClient, GenerationError};

use crate::error::BatchError;
use crate::fingerprint::batch_fingerprint;
use crate::side_channel::BestEffortCache;

/// Characters of the batch id used as the candidate id suffix.
const SUFFIX_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// Which catalog variants a batch generates.
#[derive(Debug, Clone)]
pub enum VariantSelection {
    /// `count` variants picked by tier ratios.
    Distributed {
        count: usize,
        distribution: TierDistribution,
    },
    /// Exact catalog ids.
    Explicit(Vec<String>),
}

impl VariantSelection {
    fn resolve(&self) -> Result<Vec<VariantDescriptor>, BatchError> {
        match self {
            VariantSelection::Distributed {
                count,
                distribution,
            } => select_variants(*count, distribution)
                .map_err(|e| BatchError::InvalidRequest(e.to_string())),
            VariantSelection::Explicit(ids) => {
                if ids.is_empty() {
                    return Err(BatchError::InvalidRequest(
                        "At least one variant id is required".into(),
                    ));
                }
                let mut seen = HashSet::new();
                ids.iter()
                    .map(|id| {
                        if !seen.insert(id.as_str()) {
                            return Err(BatchError::InvalidRequest(format!(
                                "Variant '{id}' requested twice"
                            )));
                        }
                        find_variant(id).cloned().ok_or_else(|| {
                            BatchError::InvalidRequest(format!("Unknown variant '{id}'"))
                        })
                    })
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub owner_id: OwnerId,
    /// The diagram the alternatives are derived from.
    pub source: String,
    pub diagram_type: DiagramType,
    pub selection: VariantSelection,
    /// Ignore any cached result for this fingerprint.
    pub force_refresh: bool,
}

impl BatchRequest {
    /// Request `count` variants with the default tier distribution.
    pub fn new(
        owner_id: OwnerId,
        source: impl Into<String>,
        diagram_type: DiagramType,
        count: usize,
    ) -> Self {
        Self {
            owner_id,
            source: source.into(),
            diagram_type,
            selection: VariantSelection::Distributed {
                count,
                distribution: TierDistribution::default(),
            },
            force_refresh: false,
        }
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }
}

/// Validation report for one candidate that had findings.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFindings {
    pub candidate_id: String,
    pub report: ValidationReport,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub fingerprint: String,
    /// Successful candidates in catalog order.
    pub candidates: Vec<GeneratedCandidate>,
    /// Every job at its terminal state. Rebuilt from the cache entry on a
    /// cache hit.
    pub jobs: Vec<GenerationJob>,
    pub findings: Vec<CandidateFindings>,
    pub requested: usize,
    pub from_cache: bool,
    /// The batch was cut short; unsettled jobs were failed as cancelled.
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn completed_count(&self) -> usize {
        self.count_status(JobStatus::Completed)
    }

    pub fn failed_count(&self) -> usize {
        self.count_status(JobStatus::Failed)
    }

    fn count_status(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|j| j.status == status).count()
    }
}

// ---------------------------------------------------------------------------
// Batch state
// ---------------------------------------------------------------------------

/// State owned by the scheduler loop for one batch.
struct BatchRun {
    batch_id: Uuid,
    key: CacheKey,
    source: String,
    suffix: String,
    variants: Vec<VariantDescriptor>,
    jobs: Vec<GenerationJob>,
    /// Candidate per variant slot, so the list stays in catalog order.
    slots: Vec<Option<GeneratedCandidate>>,
    findings: Vec<CandidateFindings>,
    settled: usize,
}

impl BatchRun {
    fn total(&self) -> usize {
        self.variants.len()
    }

    fn candidates(&self) -> Vec<GeneratedCandidate> {
        self.slots.iter().flatten().cloned().collect()
    }

    fn succeeded(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    fn failures(&self) -> Vec<RecordedFailure> {
        self.jobs
            .iter()
            .filter_map(|job| {
                job.failure.map(|kind| RecordedFailure {
                    variant_id: job.variant_id.clone(),
                    kind,
                })
            })
            .collect()
    }

    fn snapshot(&self, complete: bool) -> CacheEntry {
        CacheEntry {
            key: self.key.clone(),
            candidates: self.candidates(),
            failures: self.failures(),
            source_payload: Some(self.source.clone()),
            requested: self.total() as u32,
            complete,
            updated_at: Utc::now(),
        }
    }

    fn progress(&self, current_label: Option<String>) -> EventKind {
        EventKind::Progress(Progress {
            completed: self.settled as u32,
            total: self.total() as u32,
            current_label,
        })
    }
}

fn log_transition(batch_id: Uuid, result: Result<(), CoreError>) {
    if let Err(e) = result {
        tracing::error!(batch_id = %batch_id, error = %e, "Rejected job transition");
    }
}

/// Terminal jobs for a batch served from the cache: completed for every
/// cached candidate, failed for everything else. Variants without a recorded
/// failure count as transport errors.
fn replay_jobs(
    batch_id: Uuid,
    variants: &[VariantDescriptor],
    entry: &CacheEntry,
    client: &dyn GenerationClient,
) -> Vec<GenerationJob> {
    variants
        .iter()
        .map(|variant| {
            let mut job = GenerationJob::new(variant, client.timeout_for(variant));
            let cached = entry.candidates.iter().find(|c| c.variant_id == variant.id);
            match cached {
                Some(candidate) => {
                    log_transition(batch_id, job.start(candidate.generated_at));
                    log_transition(batch_id, job.complete(candidate.generated_at));
                }
                None => {
                    let kind = entry
                        .failures
                        .iter()
                        .find(|f| f.variant_id == variant.id)
                        .map_or(GenerationFailureKind::TransportError, |f| f.kind);
                    log_transition(batch_id, job.fail(kind, entry.updated_at));
                }
            }
            job
        })
        .collect()
}

fn job_status_event(job: &GenerationJob) -> EventKind {
    EventKind::JobStatusChanged {
        variant_id: job.variant_id.clone(),
        label: job.label.clone(),
        status: job.status,
        failure: job.failure,
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct CandidateScheduler {
    client: Arc<dyn GenerationClient>,
    cache: BestEffortCache,
    bus: Arc<EventBus>,
}

impl CandidateScheduler {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        store: Arc<dyn GenerationStore>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            client,
            cache: BestEffortCache::new(store),
            bus,
        }
    }

    /// Generate every selected variant for `request`.
    ///
    /// Returns cached candidates without calling the client when a complete
    /// batch with the same fingerprint exists and `force_refresh` is off.
    /// Partial success is `Ok`; only a batch with zero candidates is an
    /// error. Cancelling `cancel` aborts in-flight calls and fails the
    /// unsettled jobs as `cancelled`.
    pub async fn run_batch(
        &self,
        request: BatchRequest,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome, BatchError> {
        let variants = request.selection.resolve()?;
        let requested = variants.len();
        let fingerprint = batch_fingerprint(&request.source, request.diagram_type, &variants);
        let key = CacheKey::new(request.owner_id, fingerprint.clone());
        let batch_id = Uuid::new_v4();

        tracing::info!(
            batch_id = %batch_id,
            owner_id = request.owner_id,
            requested,
            diagram_type = %request.diagram_type,
            force_refresh = request.force_refresh,
            "Starting generation batch",
        );

        if !request.force_refresh {
            if let Some(entry) = self.cache.lookup(&key).await {
                if entry.complete {
                    tracing::info!(
                        batch_id = %batch_id,
                        candidates = entry.candidates.len(),
                        "Serving batch from generation cache",
                    );
                    let jobs = replay_jobs(batch_id, &variants, &entry, self.client.as_ref());
                    self.publish(
                        batch_id,
                        EventKind::Progress(Progress {
                            completed: requested as u32,
                            total: requested as u32,
                            current_label: None,
                        }),
                    );
                    return Ok(BatchOutcome {
                        batch_id,
                        fingerprint,
                        candidates: entry.candidates,
                        jobs,
                        findings: Vec::new(),
                        requested,
                        from_cache: true,
                        cancelled: false,
                    });
                }
                tracing::debug!(batch_id = %batch_id, "Cached batch is incomplete, regenerating");
            }
        }

        let jobs = variants
            .iter()
            .map(|v| GenerationJob::new(v, self.client.timeout_for(v)))
            .collect();
        let mut run = BatchRun {
            batch_id,
            key,
            source: request.source,
            suffix: batch_id.simple().to_string().chars().take(SUFFIX_LEN).collect(),
            slots: vec![None; requested],
            variants,
            jobs,
            findings: Vec::new(),
            settled: 0,
        };

        let mut tasks = self.launch(&mut run, request.diagram_type);

        let cancelled = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break true,
                joined = tasks.join_next() => match joined {
                    None => break false,
                    Some(Ok((idx, result))) => self.settle(&mut run, idx, result).await,
                    Some(Err(e)) => {
                        tracing::error!(batch_id = %batch_id, error = %e, "Generation task aborted");
                    }
                },
            }
        };

        if cancelled {
            tracing::info!(batch_id = %batch_id, "Batch cancelled, aborting in-flight generation");
            tasks.shutdown().await;
        }
        let kind = if cancelled {
            GenerationFailureKind::Cancelled
        } else {
            GenerationFailureKind::TransportError
        };
        self.fail_unsettled(&mut run, kind);

        self.finish(run, fingerprint, cancelled).await
    }

    fn publish(&self, batch_id: Uuid, kind: EventKind) {
        self.bus.publish(PipelineEvent::new(kind).with_batch(batch_id));
    }

    fn notify(&self, batch_id: Uuid, notification: Notification) {
        self.publish(batch_id, EventKind::Notification(notification));
    }

    /// Spawn one generation task per job and move every job to `generating`.
    fn launch(
        &self,
        run: &mut BatchRun,
        diagram_type: DiagramType,
    ) -> JoinSet<(usize, Result<String, GenerationError>)> {
        let summary: Arc<str> = Arc::from(summarize_source(&run.source));
        let mut tasks = JoinSet::new();

        for (idx, variant) in run.variants.iter().enumerate() {
            log_transition(run.batch_id, run.jobs[idx].start(Utc::now()));
            self.publish(run.batch_id, job_status_event(&run.jobs[idx]));

            let client = Arc::clone(&self.client);
            let summary = Arc::clone(&summary);
            let variant = variant.clone();
            tasks.spawn(async move {
                let result = client.generate(&variant, &summary, diagram_type).await;
                (idx, result)
            });
        }

        tracing::debug!(batch_id = %run.batch_id, jobs = run.total(), "Launched generation tasks");
        tasks
    }

    /// Fold one settled job into the batch.
    async fn settle(
        &self,
        run: &mut BatchRun,
        idx: usize,
        result: Result<String, GenerationError>,
    ) {
        let now = Utc::now();
        run.settled += 1;
        let variant = &run.variants[idx];
        let label = variant.title.to_string();

        match result {
            Ok(payload) => {
                log_transition(run.batch_id, run.jobs[idx].complete(now));

                let metrics = extract_metrics(&payload);
                let report = validate_candidate(variant.complexity_tier, &payload);
                let candidate = GeneratedCandidate::new(variant, &run.suffix, payload, metrics, now);

                for finding in &report.findings {
                    tracing::warn!(
                        batch_id = %run.batch_id,
                        candidate_id = %candidate.id,
                        code = finding.code,
                        severity = ?finding.severity,
                        message = %finding.message,
                        "Candidate validation finding",
                    );
                }
                if !report.is_clean() {
                    run.findings.push(CandidateFindings {
                        candidate_id: candidate.id.clone(),
                        report,
                    });
                }

                tracing::info!(
                    batch_id = %run.batch_id,
                    candidate_id = %candidate.id,
                    tasks = candidate.metrics.task_count,
                    "Candidate generated",
                );
                self.publish(
                    run.batch_id,
                    EventKind::CandidateReady {
                        candidate_id: candidate.id.clone(),
                        variant_id: candidate.variant_id.clone(),
                    },
                );
                run.slots[idx] = Some(candidate);
            }
            Err(e) => {
                let kind = e.kind();
                log_transition(run.batch_id, run.jobs[idx].fail(kind, now));
                tracing::warn!(
                    batch_id = %run.batch_id,
                    variant_id = variant.id,
                    failure = %kind,
                    error = %e,
                    "Generation job failed",
                );

                let is_last = run.settled == run.total();
                if kind == GenerationFailureKind::RateLimited {
                    self.notify(
                        run.batch_id,
                        Notification::warning(
                            "Rate limit reached",
                            format!(
                                "{label} was rate limited by the generation service. \
                                 Wait a minute before regenerating."
                            ),
                        ),
                    );
                } else if is_last {
                    self.notify(
                        run.batch_id,
                        Notification::warning("Variant failed", format!("{label}: {e}")),
                    );
                }
            }
        }

        self.publish(run.batch_id, job_status_event(&run.jobs[idx]));
        self.publish(run.batch_id, run.progress(Some(label)));

        if run.slots[idx].is_some() {
            self.cache.write(&run.snapshot(false)).await;
        }
    }

    /// Fail every job that never settled.
    fn fail_unsettled(&self, run: &mut BatchRun, kind: GenerationFailureKind) {
        let now = Utc::now();
        let mut swept = 0;
        for idx in 0..run.jobs.len() {
            if run.jobs[idx].status.is_terminal() {
                continue;
            }
            log_transition(run.batch_id, run.jobs[idx].fail(kind, now));
            self.publish(run.batch_id, job_status_event(&run.jobs[idx]));
            swept += 1;
        }
        if swept > 0 {
            run.settled += swept;
            self.publish(run.batch_id, run.progress(None));
        }
    }

    async fn finish(
        &self,
        run: BatchRun,
        fingerprint: String,
        cancelled: bool,
    ) -> Result<BatchOutcome, BatchError> {
        let total = run.total();
        let succeeded = run.succeeded();
        let failed = total - succeeded;

        tracing::info!(
            batch_id = %run.batch_id,
            requested = total,
            completed = succeeded,
            failed,
            cancelled,
            "Generation batch finished",
        );

        if succeeded == 0 {
            if cancelled {
                return Err(BatchError::Cancelled { jobs: run.jobs });
            }
            self.notify(
                run.batch_id,
                Notification::error(
                    "Generation failed",
                    format!(
                        "None of the {total} alternatives could be generated. \
                         Check the connection and try again in a moment."
                    ),
                ),
            );
            return Err(BatchError::AllFailed { jobs: run.jobs });
        }

        // A cancelled batch must not short-circuit the next request.
        self.cache.write(&run.snapshot(!cancelled)).await;

        if cancelled {
            self.notify(
                run.batch_id,
                Notification::warning(
                    "Generation cancelled",
                    format!("{succeeded} of {total} alternatives finished before cancellation."),
                ),
            );
        } else if failed > 0 {
            self.notify(
                run.batch_id,
                Notification::warning(
                    "Some alternatives failed",
                    format!("{failed} of {total} alternatives could not be generated."),
                ),
            );
        }

        Ok(BatchOutcome {
            batch_id: run.batch_id,
            fingerprint,
            candidates: run.candidates(),
            jobs: run.jobs,
            findings: run.findings,
            requested: total,
            from_cache: false,
            cancelled,
        })
    }
}
