use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use variantflow_core::generation_cache::{GenerationStore, InMemoryGenerationStore};
use variantflow_core::scoring::{rank, recommend};
use variantflow_events::{CandidateIntent, EventBus, EventKind, EventLogger};
use variantflow_generation::{GenerationConfig, HttpGenerationClient};
use variantflow_pipeline::{BatchRequest, CandidateScheduler, PipelineConfig, VariantSelection};
use variantflow_preview::{PreviewConfig, PreviewPipeline};
use variantflow_worker::export::write_candidate;
use variantflow_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let worker_config = WorkerConfig::from_env()?;
    init_tracing(worker_config.log_json);

    // --- Configuration ---
    let source_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: variantflow-worker <source.bpmn>")?;
    let source = tokio::fs::read_to_string(&source_path)
        .await
        .with_context(|| format!("Failed to read {}", source_path.display()))?;

    let generation_config = GenerationConfig::from_env()?;
    let pipeline_config = PipelineConfig::from_env()?;
    let preview_config = PreviewConfig::from_env()?;
    tracing::info!(
        base_url = %generation_config.base_url,
        diagram_type = %pipeline_config.diagram_type,
        variants = pipeline_config.variant_count,
        output_dir = %worker_config.output_dir.display(),
        "Loaded worker configuration",
    );

    // --- Generation cache ---
    let store: Arc<dyn GenerationStore> = match &worker_config.database_url {
        Some(url) => {
            let pool = variantflow_db::create_pool(url)
                .await
                .context("Failed to connect to database")?;
            variantflow_db::health_check(&pool)
                .await
                .context("Database health check failed")?;
            variantflow_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Using Postgres generation cache");
            Arc::new(variantflow_db::PgGenerationStore::new(pool))
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory generation cache");
            Arc::new(InMemoryGenerationStore::new())
        }
    };

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe()));

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling batch");
            ctrl_c_cancel.cancel();
        }
    });

    // --- Generation ---
    let scheduler = CandidateScheduler::new(
        Arc::new(HttpGenerationClient::new(&generation_config)),
        store,
        Arc::clone(&event_bus),
    );
    let request = BatchRequest {
        owner_id: pipeline_config.owner_id,
        source,
        diagram_type: pipeline_config.diagram_type,
        selection: VariantSelection::Distributed {
            count: pipeline_config.variant_count,
            distribution: pipeline_config.distribution,
        },
        force_refresh: pipeline_config.force_refresh,
    };
    let mut outcome = scheduler.run_batch(request, cancel).await?;

    // --- Previews ---
    let previews = PreviewPipeline::new(preview_config).with_event_bus(Arc::clone(&event_bus));
    let rendered = previews.render_all(&mut outcome.candidates).await;

    for (position, (candidate, score)) in rank(&outcome.candidates).into_iter().enumerate() {
        tracing::info!(
            rank = position + 1,
            candidate_id = %candidate.id,
            tier = %candidate.complexity_tier,
            score,
            preview_failed = candidate.preview_failed,
            "Ranked candidate",
        );
    }

    // --- Export ---
    tokio::fs::create_dir_all(&worker_config.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", worker_config.output_dir.display()))?;

    for (candidate, preview) in outcome.candidates.iter().zip(&rendered) {
        for file in write_candidate(&worker_config.output_dir, candidate, preview).await? {
            event_bus.emit(EventKind::Intent {
                intent: file.intent(),
            });
        }
    }

    if let Some(best) = recommend(&outcome.candidates) {
        tracing::info!(candidate_id = %best.id, "Recommended candidate");
        event_bus.emit(EventKind::Intent {
            intent: CandidateIntent::Apply {
                candidate_id: best.id.clone(),
                payload: best.payload.clone(),
            },
        });
    }

    tracing::info!(
        batch_id = %outcome.batch_id,
        candidates = outcome.candidates.len(),
        from_cache = outcome.from_cache,
        "Worker finished",
    );

    // Dropping every bus handle closes the channel and stops the logger.
    drop(scheduler);
    drop(previews);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "variantflow_worker=debug,variantflow_pipeline=debug,variantflow_preview=info,\
         variantflow_generation=info,variantflow_events=info"
            .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
