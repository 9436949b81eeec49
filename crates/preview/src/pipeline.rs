//! Tiered preview rendering.
//!
//! `primary -> secondary -> remote -> synthetic`. Tiers run one after another
//! for a single preview; previews for different candidates run concurrently.
//! Each engine tier runs on the blocking pool and is raced against the tier
//! budget. A tier that loses the race is abandoned and whatever it produces
//! later is discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use variantflow_core::candidate::GeneratedCandidate;
use variantflow_core::metrics::classify_complexity;
use variantflow_events::{EventBus, EventKind};

use crate::cache::PreviewCache;
use crate::config::PreviewConfig;
use crate::engine::{EngineRenderer, PreviewRenderer};
use crate::error::RenderError;
use crate::outcome::{ImageFormat, PreviewImage, PreviewOutcome, PreviewTier, RenderSize};
use crate::remote::{HttpRemoteRenderer, RemoteRenderer};
use crate::synthetic::{synthetic_preview, synthetic_svg};

pub struct PreviewPipeline {
    engine: Arc<dyn PreviewRenderer>,
    remote: Option<Arc<dyn RemoteRenderer>>,
    cache: Arc<PreviewCache>,
    bus: Option<Arc<EventBus>>,
    config: PreviewConfig,
}

impl PreviewPipeline {
    /// Pipeline with the local engine, and a remote renderer when
    /// `config.remote_url` is set.
    pub fn new(config: PreviewConfig) -> Self {
        let remote = config.remote_url.as_ref().map(|url| {
            Arc::new(HttpRemoteRenderer::new(url.clone(), config.remote_timeout))
                as Arc<dyn RemoteRenderer>
        });
        Self {
            engine: Arc::new(EngineRenderer::new()),
            remote,
            cache: Arc::new(PreviewCache::new(config.cache_ttl)),
            bus: None,
            config,
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn PreviewRenderer>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_remote(mut self, remote: Option<Arc<dyn RemoteRenderer>>) -> Self {
        self.remote = remote;
        self
    }

    /// Share a cache between pipelines.
    pub fn with_cache(mut self, cache: Arc<PreviewCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Publish a `PreviewReady` event for every rendered candidate.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn cache(&self) -> &Arc<PreviewCache> {
        &self.cache
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Preview for `payload`, from the cache when a fresh entry exists.
    /// Always yields an image.
    pub async fn render(&self, payload: &str, title: &str) -> PreviewOutcome {
        let key = PreviewCache::key(payload, title);
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(title = %title, tier = %hit.tier, "Preview cache hit");
            return hit;
        }

        let outcome = self.render_uncached(payload, title).await;
        self.cache.insert(key, outcome.clone()).await;
        outcome
    }

    /// Render one candidate and record whether its preview is degraded.
    pub async fn render_candidate(&self, candidate: &mut GeneratedCandidate) -> PreviewOutcome {
        let outcome = self.render(&candidate.payload, &candidate.title).await;
        candidate.preview_failed = outcome.degraded;

        if let Some(bus) = &self.bus {
            bus.emit(EventKind::PreviewReady {
                candidate_id: candidate.id.clone(),
                tier: outcome.tier.as_str().to_string(),
                degraded: outcome.degraded,
            });
        }
        outcome
    }

    /// Render every candidate concurrently. Outcomes keep input order.
    pub async fn render_all(&self, candidates: &mut [GeneratedCandidate]) -> Vec<PreviewOutcome> {
        futures::future::join_all(
            candidates
                .iter_mut()
                .map(|candidate| self.render_candidate(candidate)),
        )
        .await
    }

    async fn render_uncached(&self, payload: &str, title: &str) -> PreviewOutcome {
        let payload: Arc<str> = Arc::from(payload);
        let title: Arc<str> = Arc::from(title);

        match self
            .run_engine(&payload, &title, self.config.primary_size)
            .await
        {
            Ok(image) => return PreviewOutcome::new(image, PreviewTier::Primary),
            Err(e) => log_tier_failure(PreviewTier::Primary, &title, &e),
        }

        tokio::time::sleep(self.config.settle_delay).await;

        match self
            .run_engine(&payload, &title, self.config.secondary_size)
            .await
        {
            Ok(image) => return PreviewOutcome::new(image, PreviewTier::Secondary),
            Err(e) => log_tier_failure(PreviewTier::Secondary, &title, &e),
        }

        if let Some(remote) = &self.remote {
            let class = classify_complexity(&payload);
            if class.is_heavy() {
                match self.run_remote(remote.as_ref(), &payload, &title).await {
                    Ok(image) => return PreviewOutcome::new(image, PreviewTier::Remote),
                    Err(e) => log_tier_failure(PreviewTier::Remote, &title, &e),
                }
            } else {
                tracing::debug!(title = %title, class = ?class, "Skipping remote render tier");
            }
        }

        let image = run_synthetic(payload, title, self.config.primary_size).await;
        PreviewOutcome::new(image, PreviewTier::Synthetic)
    }

    async fn run_engine(
        &self,
        payload: &Arc<str>,
        title: &Arc<str>,
        size: RenderSize,
    ) -> Result<PreviewImage, RenderError> {
        let engine = Arc::clone(&self.engine);
        let (payload, title) = (Arc::clone(payload), Arc::clone(title));
        let budget = self.config.tier_timeout;

        // A blocking task cannot be aborted. Cancelling the token on the way
        // out tells the engine to stop at its next checkpoint instead of
        // holding a blocking thread until it finishes.
        let cancel = CancellationToken::new();
        let _abandon_on_exit = cancel.clone().drop_guard();
        let name = engine.name();

        let task =
            tokio::task::spawn_blocking(move || engine.render(&payload, &title, size, &cancel));
        match tokio::time::timeout(budget, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(RenderError::Engine(format!("render task failed: {join}"))),
            Err(_) => {
                tracing::debug!(
                    engine = name,
                    budget_ms = budget.as_millis() as u64,
                    "Engine render abandoned",
                );
                Err(RenderError::Timeout(budget))
            }
        }
    }

    async fn run_remote(
        &self,
        remote: &dyn RemoteRenderer,
        payload: &str,
        title: &str,
    ) -> Result<PreviewImage, RenderError> {
        let budget = self.config.remote_timeout;
        tokio::time::timeout(budget, remote.render(payload, title))
            .await
            .map_err(|_| RenderError::Timeout(budget))?
    }
}

fn log_tier_failure(tier: PreviewTier, title: &str, error: &RenderError) {
    tracing::warn!(tier = %tier, title = %title, error = %error, "Preview tier failed, trying next");
}

async fn run_synthetic(payload: Arc<str>, title: Arc<str>, size: RenderSize) -> PreviewImage {
    let (p, t) = (Arc::clone(&payload), Arc::clone(&title));
    match tokio::task::spawn_blocking(move || synthetic_preview(&p, &t, size)).await {
        Ok(image) => image,
        Err(e) => {
            tracing::error!(error = %e, "Synthetic render task failed, returning SVG");
            PreviewImage {
                bytes: synthetic_svg(&payload, &title).into_bytes(),
                format: ImageFormat::Svg,
                width: size.width,
                height: size.height,
            }
        }
    }
}

/// How long a full cascade may take in the worst case, excluding the
/// synthetic tier.
pub fn worst_case_budget(config: &PreviewConfig, remote_configured: bool) -> Duration {
    let remote = if remote_configured {
        config.remote_timeout
    } else {
        Duration::ZERO
    };
    config.tier_timeout * 2 + config.settle_delay + remote
}
