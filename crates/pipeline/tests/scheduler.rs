//! Candidate scheduler against scripted generation clients.
//!
//! Tests run on a paused clock so settle order is decided by the scripted
//! delays alone.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use variantflow_core::candidate::{CandidateSelection, GenerationFailureKind, JobStatus};
use variantflow_core::catalog::{select_variants, TierDistribution, VariantDescriptor};
use variantflow_core::generation_cache::{
    CacheEntry, CacheKey, GenerationStore, InMemoryGenerationStore, StoreError,
};
use variantflow_core::tier::{ComplexityTier, DiagramType};
use variantflow_core::validation::CODE_STRUCTURAL_WARNING;
use variantflow_events::{EventBus, EventKind, Notification, NotificationSeverity, PipelineEvent};
use variantflow_generation::{GenerationClient, GenerationError};
use variantflow_pipeline::{
    batch_fingerprint, BatchError, BatchRequest, CandidateScheduler, VariantSelection,
};

const SOURCE: &str = r#"<definitions>
  <process id="order">
    <startEvent id="s"/>
    <task id="t1" name="Receive order"/>
    <task id="t2" name="Ship order"/>
    <endEvent id="e"/>
  </process>
</definitions>"#;

const OWNER: i64 = 42;

type Script = dyn Fn(&VariantDescriptor) -> (Duration, Result<String, GenerationError>)
    + Send
    + Sync;

/// Client whose answer and latency per variant come from a script.
struct ScriptedClient {
    calls: AtomicUsize,
    script: Box<Script>,
}

impl ScriptedClient {
    fn new(
        script: impl Fn(&VariantDescriptor) -> (Duration, Result<String, GenerationError>)
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Box::new(script),
        })
    }

    /// Every variant succeeds after one second.
    fn succeeding() -> Arc<Self> {
        Self::new(|v| (Duration::from_secs(1), Ok(payload_for(v))))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(
        &self,
        variant: &VariantDescriptor,
        _source_summary: &str,
        _diagram_type: DiagramType,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, result) = (self.script)(variant);
        tokio::time::sleep(delay).await;
        result
    }
}

struct FailingStore;

#[async_trait]
impl GenerationStore for FailingStore {
    async fn find(&self, _: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Err(StoreError::Read("connection refused".into()))
    }

    async fn upsert(&self, _: &CacheEntry) -> Result<(), StoreError> {
        Err(StoreError::Write("connection refused".into()))
    }
}

/// Records every upsert attempt and refuses writes from `fail_from` on.
struct RecordingStore {
    inner: InMemoryGenerationStore,
    attempts: Mutex<Vec<CacheEntry>>,
    fail_from: Option<usize>,
}

impl RecordingStore {
    fn new(fail_from: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryGenerationStore::new(),
            attempts: Mutex::new(Vec::new()),
            fail_from,
        })
    }

    fn attempts(&self) -> Vec<CacheEntry> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationStore for RecordingStore {
    async fn find(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        self.inner.find(key).await
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(entry.clone());
            attempts.len() - 1
        };
        if self.fail_from.is_some_and(|n| attempt >= n) {
            return Err(StoreError::Write("disk full".into()));
        }
        self.inner.upsert(entry).await
    }
}

fn candidate_ids(entry: &CacheEntry) -> HashSet<String> {
    entry.candidates.iter().map(|c| c.id.clone()).collect()
}

fn payload_for(variant: &VariantDescriptor) -> String {
    format!(
        r#"<definitions><process id="p">
            <startEvent id="s"/>
            <task id="a" name="{} step one"/>
            <task id="b" name="{} step two"/>
            <task id="c" name="Close"/>
            <endEvent id="e"/>
            <sequenceFlow id="f1" sourceRef="s" targetRef="a"/>
            <sequenceFlow id="f2" sourceRef="a" targetRef="b"/>
            <sequenceFlow id="f3" sourceRef="b" targetRef="c"/>
            <sequenceFlow id="f4" sourceRef="c" targetRef="e"/>
        </process></definitions>"#,
        variant.title, variant.title
    )
}

struct Harness {
    scheduler: CandidateScheduler,
    store: Arc<InMemoryGenerationStore>,
    events: broadcast::Receiver<PipelineEvent>,
}

fn harness(client: Arc<ScriptedClient>) -> Harness {
    let store = Arc::new(InMemoryGenerationStore::new());
    let bus = Arc::new(EventBus::default());
    let events = bus.subscribe();
    let scheduler = CandidateScheduler::new(client, store.clone(), bus);
    Harness {
        scheduler,
        store,
        events,
    }
}

fn drain(rx: &mut broadcast::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn notifications(events: &[PipelineEvent]) -> Vec<Notification> {
    events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::Notification(n) => Some(n.clone()),
            _ => None,
        })
        .collect()
}

fn request(count: usize) -> BatchRequest {
    BatchRequest::new(OWNER, SOURCE, DiagramType::Bpmn, count)
}

// ---- Test: Scenario A, partial failure yields one aggregate warning ----

#[tokio::test(start_paused = true)]
async fn partial_failure_aggregates_notifications() {
    let client = ScriptedClient::new(|v| match v.id {
        "decision-driven" | "orchestrated-services" => (
            Duration::from_secs(1),
            Err(GenerationError::Timeout(Duration::from_secs(90))),
        ),
        _ => (Duration::from_secs(2), Ok(payload_for(v))),
    });
    let mut h = harness(client.clone());

    let outcome = h
        .scheduler
        .run_batch(request(5), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(client.calls(), 5);
    assert_eq!(outcome.candidates.len(), 3);
    assert_eq!(outcome.completed_count(), 3);
    assert_eq!(outcome.failed_count(), 2);
    assert!(!outcome.from_cache);
    assert!(outcome
        .jobs
        .iter()
        .filter(|j| j.status == JobStatus::Failed)
        .all(|j| j.failure == Some(GenerationFailureKind::Timeout)));

    let suffix: String = outcome.batch_id.simple().to_string().chars().take(8).collect();
    assert!(outcome.candidates.iter().all(|c| c.id.ends_with(&suffix)));

    let notes = notifications(&drain(&mut h.events));
    assert_eq!(notes.len(), 1, "{notes:?}");
    assert_eq!(notes[0].severity, NotificationSeverity::Warning);
    assert_eq!(notes[0].title, "Some alternatives failed");
    assert!(notes[0].message.starts_with("2 of 5"));

    let stored = h
        .store
        .find(&CacheKey::new(OWNER, outcome.fingerprint.clone()))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.complete);
    assert_eq!(stored.candidates, outcome.candidates);
    assert_eq!(stored.requested, 5);
}

// ---- Test: completed + failed == N for every batch size ----

#[tokio::test(start_paused = true)]
async fn settled_jobs_always_sum_to_batch_size() {
    for k in [3, 5, 7] {
        let client = ScriptedClient::new(|v| {
            let fail = v.title.len() % 2 == 0;
            let delay = Duration::from_millis(100 * v.title.len() as u64);
            if fail {
                (delay, Err(GenerationError::Transport("connection reset".into())))
            } else {
                (delay, Ok(payload_for(v)))
            }
        });
        let h = harness(client.clone());

        match h.scheduler.run_batch(request(k), CancellationToken::new()).await {
            Ok(outcome) => {
                assert_eq!(outcome.jobs.len(), k);
                assert_eq!(outcome.completed_count() + outcome.failed_count(), k);
                assert_eq!(outcome.candidates.len(), outcome.completed_count());
            }
            Err(e) => {
                assert_eq!(e.jobs().len(), k);
                assert!(e.jobs().iter().all(|j| j.status == JobStatus::Failed));
            }
        }
        assert_eq!(client.calls(), k);
    }
}

// ---- Test: candidates keep catalog order whatever the settle order ----

#[tokio::test(start_paused = true)]
async fn candidates_follow_catalog_order() {
    // Later catalog entries finish first.
    let client = ScriptedClient::new(|v| {
        let rank = 10 - v.title.len().min(9) as u64;
        (Duration::from_millis(100 * rank), Ok(payload_for(v)))
    });
    let h = harness(client);

    let outcome = h
        .scheduler
        .run_batch(request(7), CancellationToken::new())
        .await
        .unwrap();

    let expected: Vec<&str> = select_variants(7, &TierDistribution::default())
        .unwrap()
        .iter()
        .map(|v| v.id)
        .collect();
    let actual: Vec<&str> = outcome.candidates.iter().map(|c| c.variant_id.as_str()).collect();
    assert_eq!(actual, expected);
}

// ---- Test: Scenario B, identical source served from cache ----

#[tokio::test(start_paused = true)]
async fn identical_source_is_served_from_cache() {
    let client = ScriptedClient::succeeding();
    let mut h = harness(client.clone());

    let first = h
        .scheduler
        .run_batch(request(5), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(client.calls(), 5);
    drain(&mut h.events);

    // Same diagram with different layout whitespace and line endings.
    let reformatted = SOURCE.replace('\n', "\r\n    ");
    let second = h
        .scheduler
        .run_batch(
            BatchRequest::new(OWNER, reformatted, DiagramType::Bpmn, 5),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(client.calls(), 5, "second run must not call the client");
    assert!(second.from_cache);
    assert_eq!(second.candidates, first.candidates);
    assert_eq!(second.jobs.len(), 5);
    assert_eq!(second.completed_count(), 5);

    let events = drain(&mut h.events);
    assert_eq!(events.len(), 1);
    assert_matches!(
        &events[0].kind,
        EventKind::Progress(p) if p.completed == 5 && p.total == 5
    );
}

#[tokio::test(start_paused = true)]
async fn force_refresh_bypasses_cache() {
    let client = ScriptedClient::succeeding();
    let h = harness(client.clone());

    h.scheduler
        .run_batch(request(3), CancellationToken::new())
        .await
        .unwrap();
    let again = h
        .scheduler
        .run_batch(request(3).with_force_refresh(true), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(client.calls(), 6);
    assert!(!again.from_cache);
}

#[tokio::test(start_paused = true)]
async fn incomplete_cache_entry_is_regenerated() {
    let client = ScriptedClient::succeeding();
    let h = harness(client.clone());

    let variants = select_variants(3, &TierDistribution::default()).unwrap();
    let fingerprint = batch_fingerprint(SOURCE, DiagramType::Bpmn, &variants);
    h.store
        .upsert(&CacheEntry {
            key: CacheKey::new(OWNER, fingerprint),
            candidates: Vec::new(),
            failures: Vec::new(),
            source_payload: None,
            requested: 3,
            complete: false,
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let outcome = h
        .scheduler
        .run_batch(request(3), CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.from_cache);
    assert_eq!(client.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn cached_batch_replays_every_job() {
    let client = ScriptedClient::new(|v| match v.id {
        "decision-driven" => (
            Duration::from_secs(1),
            Err(GenerationError::Timeout(Duration::from_secs(90))),
        ),
        _ => (Duration::from_secs(2), Ok(payload_for(v))),
    });
    let h = harness(client.clone());

    let first = h
        .scheduler
        .run_batch(request(5), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!((first.completed_count(), first.failed_count()), (4, 1));

    let second = h
        .scheduler
        .run_batch(request(5), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(client.calls(), 5);
    assert!(second.from_cache);
    assert_eq!(second.candidates.len(), 4);
    assert_eq!(second.jobs.len(), second.requested);
    assert_eq!(second.completed_count() + second.failed_count(), 5);
    assert!(second.jobs.iter().all(|j| j.status.is_terminal()));

    let failed: Vec<_> = second
        .jobs
        .iter()
        .filter(|j| j.status == JobStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].variant_id, "decision-driven");
    assert_eq!(failed[0].failure, Some(GenerationFailureKind::Timeout));
}

#[tokio::test(start_paused = true)]
async fn cached_batch_without_failure_records_still_counts_missing_slots() {
    let client = ScriptedClient::succeeding();
    let h = harness(client.clone());

    let variants = select_variants(3, &TierDistribution::default()).unwrap();
    let fingerprint = batch_fingerprint(SOURCE, DiagramType::Bpmn, &variants);
    let first = h
        .scheduler
        .run_batch(request(3), CancellationToken::new())
        .await
        .unwrap();
    let mut entry = h
        .store
        .find(&CacheKey::new(OWNER, fingerprint))
        .await
        .unwrap()
        .unwrap();
    entry.candidates.truncate(2);
    entry.failures.clear();
    h.store.upsert(&entry).await.unwrap();

    let replay = h
        .scheduler
        .run_batch(request(3), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(client.calls(), 3);
    assert_eq!(replay.candidates, first.candidates[..2].to_vec());
    assert_eq!(replay.completed_count(), 2);
    assert_eq!(replay.failed_count(), 1);
    assert_eq!(replay.jobs[2].failure, Some(GenerationFailureKind::TransportError));
}

// ---- Test: the generation cache is written as candidates settle ----

#[tokio::test(start_paused = true)]
async fn cache_grows_with_each_settled_candidate() {
    let client = ScriptedClient::new(|v| match v.id {
        "decision-driven" => (
            Duration::from_millis(1500),
            Err(GenerationError::Transport("HTTP 500: boom".into())),
        ),
        _ => (Duration::from_millis(100 * v.title.len() as u64), Ok(payload_for(v))),
    });
    let store = RecordingStore::new(None);
    let scheduler = CandidateScheduler::new(client, store.clone(), Arc::new(EventBus::default()));

    let outcome = scheduler
        .run_batch(request(5), CancellationToken::new())
        .await
        .unwrap();

    let attempts = store.attempts();
    let (last, partial) = attempts.split_last().unwrap();
    assert_eq!(partial.len(), 4);
    assert!(partial.iter().all(|e| !e.complete));
    for pair in partial.windows(2) {
        let (before, after) = (candidate_ids(&pair[0]), candidate_ids(&pair[1]));
        assert!(after.is_superset(&before));
        assert!(after.len() > before.len());
    }

    assert!(last.complete);
    assert_eq!(last.candidates, outcome.candidates);
    assert_eq!(last.failures.len(), 1);
    assert_eq!(last.failures[0].variant_id, "decision-driven");
}

#[tokio::test(start_paused = true)]
async fn store_failure_keeps_earlier_partial_writes() {
    let client = ScriptedClient::new(|v| {
        (Duration::from_millis(100 * v.title.len() as u64), Ok(payload_for(v)))
    });
    let store = RecordingStore::new(Some(2));
    let scheduler = CandidateScheduler::new(client, store.clone(), Arc::new(EventBus::default()));

    let outcome = scheduler
        .run_batch(request(5), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.candidates.len(), 5);
    assert_eq!(store.attempts().len(), 6);

    let kept = store
        .find(&CacheKey::new(OWNER, outcome.fingerprint.clone()))
        .await
        .unwrap()
        .unwrap();
    assert!(!kept.complete);
    assert_eq!(kept.candidates.len(), 2);
    assert_eq!(candidate_ids(&kept), candidate_ids(&store.attempts()[1]));
}

// ---- Test: zero successes is a distinct error ----

#[tokio::test(start_paused = true)]
async fn all_failed_raises_single_error_notification() {
    let client = ScriptedClient::new(|_| {
        (
            Duration::from_secs(1),
            Err(GenerationError::MalformedResponse("missing payload".into())),
        )
    });
    let mut h = harness(client);

    let err = h
        .scheduler
        .run_batch(request(3), CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(&err, BatchError::AllFailed { jobs } if jobs.len() == 3);
    assert!(err
        .jobs()
        .iter()
        .all(|j| j.failure == Some(GenerationFailureKind::MalformedResponse)));

    let notes = notifications(&drain(&mut h.events));
    let errors: Vec<_> = notes
        .iter()
        .filter(|n| n.severity == NotificationSeverity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("try again"));
    // The last settled failure is announced on its own.
    assert_eq!(notes.iter().filter(|n| n.title == "Variant failed").count(), 1);
    assert!(h.store.is_empty().await);
}

// ---- Test: per-failure notification policy ----

#[tokio::test(start_paused = true)]
async fn rate_limited_failure_is_announced_immediately() {
    let client = ScriptedClient::new(|v| match v.id {
        "linear-essentials" => (Duration::from_millis(500), Err(GenerationError::RateLimited)),
        _ => (Duration::from_secs(2), Ok(payload_for(v))),
    });
    let mut h = harness(client);

    let outcome = h
        .scheduler
        .run_batch(request(3), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.failed_count(), 1);

    let notes = notifications(&drain(&mut h.events));
    let titles: Vec<&str> = notes.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["Rate limit reached", "Some alternatives failed"]);
}

#[tokio::test(start_paused = true)]
async fn last_settled_failure_is_announced() {
    let client = ScriptedClient::new(|v| match v.id {
        "linear-essentials" => (
            Duration::from_secs(5),
            Err(GenerationError::Transport("HTTP 502: bad gateway".into())),
        ),
        "decision-driven" => (
            Duration::from_secs(1),
            Err(GenerationError::Transport("HTTP 500: boom".into())),
        ),
        _ => (Duration::from_secs(2), Ok(payload_for(v))),
    });
    let mut h = harness(client);

    h.scheduler
        .run_batch(request(5), CancellationToken::new())
        .await
        .unwrap();

    let notes = notifications(&drain(&mut h.events));
    let per_failure: Vec<_> = notes.iter().filter(|n| n.title == "Variant failed").collect();
    assert_eq!(per_failure.len(), 1);
    assert!(per_failure[0].message.contains("502"));
    assert_eq!(notes.last().map(|n| n.title.as_str()), Some("Some alternatives failed"));
}

// ---- Test: Scenario D, validation warns but never drops a candidate ----

#[tokio::test(start_paused = true)]
async fn basic_candidate_with_gateway_keeps_requested_tier() {
    let client = ScriptedClient::new(|_| {
        (
            Duration::from_millis(10),
            Ok(r#"<definitions><process>
                <startEvent id="s"/><task id="a" name="Check"/>
                <exclusiveGateway id="g"/><task id="b" name="Approve"/><task id="c" name="Reject"/>
                <endEvent id="e"/>
                <sequenceFlow id="f1" sourceRef="s" targetRef="a"/>
                <sequenceFlow id="f2" sourceRef="a" targetRef="g"/>
                <sequenceFlow id="f3" sourceRef="g" targetRef="b"/>
                <sequenceFlow id="f4" sourceRef="g" targetRef="c"/>
                <sequenceFlow id="f5" sourceRef="b" targetRef="e"/>
                <sequenceFlow id="f6" sourceRef="c" targetRef="e"/>
            </process></definitions>"#
                .to_string()),
        )
    });
    let h = harness(client);

    let request = BatchRequest {
        selection: VariantSelection::Explicit(vec!["linear-essentials".into()]),
        ..request(1)
    };
    let outcome = h
        .scheduler
        .run_batch(request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.candidates.len(), 1);
    let candidate = &outcome.candidates[0];
    assert_eq!(candidate.complexity_tier, ComplexityTier::Basic);
    assert_eq!(candidate.metrics.decision_points, 1);

    assert_eq!(outcome.findings.len(), 1);
    let report = &outcome.findings[0].report;
    assert!(!report.has_errors());
    assert!(report.warnings().any(|w| w.code == CODE_STRUCTURAL_WARNING));
}

// ---- Test: cancellation propagates ----

#[tokio::test(start_paused = true)]
async fn cancellation_fails_unsettled_jobs() {
    let client = ScriptedClient::new(|v| match v.complexity_tier {
        ComplexityTier::Basic => (Duration::from_secs(1), Ok(payload_for(v))),
        _ => (Duration::from_secs(60), Ok(payload_for(v))),
    });
    let mut h = harness(client);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let outcome = h.scheduler.run_batch(request(5), cancel).await.unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(outcome.completed_count() + outcome.failed_count(), 5);
    assert!(outcome
        .jobs
        .iter()
        .filter(|j| j.status == JobStatus::Failed)
        .all(|j| j.failure == Some(GenerationFailureKind::Cancelled)));

    let stored = h
        .store
        .find(&CacheKey::new(OWNER, outcome.fingerprint.clone()))
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.complete, "a cancelled batch must not be reused");

    let events = drain(&mut h.events);
    let last_progress = events
        .iter()
        .rev()
        .find_map(|e| match &e.kind {
            EventKind::Progress(p) => Some(p.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_progress.completed, 5);
}

#[tokio::test(start_paused = true)]
async fn cancellation_before_any_success_is_error() {
    let client = ScriptedClient::new(|v| (Duration::from_secs(60), Ok(payload_for(v))));
    let h = harness(client);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h.scheduler.run_batch(request(3), cancel).await.unwrap_err();
    assert_matches!(&err, BatchError::Cancelled { jobs } if jobs.len() == 3);
    assert!(err
        .jobs()
        .iter()
        .all(|j| j.failure == Some(GenerationFailureKind::Cancelled)));
}

// ---- Test: progress is published per settle ----

#[tokio::test(start_paused = true)]
async fn progress_counts_every_settle() {
    let client = ScriptedClient::new(|v| match v.id {
        "happy-path" => (Duration::from_secs(1), Err(GenerationError::Transport("reset".into()))),
        _ => (Duration::from_secs(2), Ok(payload_for(v))),
    });
    let mut h = harness(client);

    h.scheduler
        .run_batch(
            BatchRequest {
                selection: VariantSelection::Explicit(vec![
                    "happy-path".into(),
                    "decision-driven".into(),
                    "multi-participant".into(),
                ]),
                ..request(3)
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let completed: Vec<u32> = drain(&mut h.events)
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::Progress(p) => {
                assert_eq!(p.total, 3);
                Some(p.completed)
            }
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![1, 2, 3]);
}

// ---- Test: cache failures never fail a batch ----

#[tokio::test(start_paused = true)]
async fn store_failures_are_best_effort() {
    let bus = Arc::new(EventBus::default());
    let client = ScriptedClient::succeeding();
    let scheduler = CandidateScheduler::new(client.clone(), Arc::new(FailingStore), bus);

    let outcome = scheduler
        .run_batch(request(3), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.candidates.len(), 3);
    assert_eq!(client.calls(), 3);
}

// ---- Test: invalid requests ----

#[tokio::test]
async fn invalid_selections_are_rejected() {
    let h = harness(ScriptedClient::succeeding());

    let zero = h.scheduler.run_batch(request(0), CancellationToken::new()).await;
    assert_matches!(zero, Err(BatchError::InvalidRequest(_)));

    let unknown = BatchRequest {
        selection: VariantSelection::Explicit(vec!["no-such-variant".into()]),
        ..request(1)
    };
    assert_matches!(
        h.scheduler.run_batch(unknown, CancellationToken::new()).await,
        Err(BatchError::InvalidRequest(msg)) if msg.contains("no-such-variant")
    );

    let duplicate = BatchRequest {
        selection: VariantSelection::Explicit(vec!["happy-path".into(), "happy-path".into()]),
        ..request(2)
    };
    assert_matches!(
        h.scheduler.run_batch(duplicate, CancellationToken::new()).await,
        Err(BatchError::InvalidRequest(_))
    );
}

// ---- Test: selection survives regeneration ----

#[tokio::test(start_paused = true)]
async fn selection_reconciles_after_regeneration() {
    let h = harness(ScriptedClient::succeeding());

    let first = h
        .scheduler
        .run_batch(request(3), CancellationToken::new())
        .await
        .unwrap();
    let mut selection = CandidateSelection::default();
    selection.select(&first.candidates[2].id, &first.candidates).unwrap();

    let second = h
        .scheduler
        .run_batch(request(3).with_force_refresh(true), CancellationToken::new())
        .await
        .unwrap();
    selection.reconcile(&second.candidates);

    // New batch, new ids: the old selection vanished.
    assert_eq!(selection.selected(), Some(second.candidates[0].id.as_str()));

    selection.reconcile(&[]);
    assert_eq!(selection.selected(), None);
}
