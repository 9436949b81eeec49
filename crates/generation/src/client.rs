//! The [`GenerationClient`] seam and its HTTP implementation.
//!
//! One call produces one variant. The call is raced against the variant's
//! tier budget and every failure is mapped onto a [`GenerationError`].
//! There are no retries at this layer.

use std::time::Duration;

use async_trait::async_trait;
use variantflow_core::catalog::VariantDescriptor;
use variantflow_core::tier::DiagramType;

use crate::api::{GenerationApi, GenerationApiError};
use crate::config::GenerationConfig;
use crate::error::GenerationError;
use crate::messages::InvokeRequest;
use crate::prompt::build_prompt;
use crate::timeouts::TimeoutSchedule;

/// Longest error body kept in a transport error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate one alternative diagram for `variant`.
    async fn generate(
        &self,
        variant: &VariantDescriptor,
        source_summary: &str,
        diagram_type: DiagramType,
    ) -> Result<String, GenerationError>;

    /// Time budget a call for `variant` is allowed.
    fn timeout_for(&self, variant: &VariantDescriptor) -> Duration {
        TimeoutSchedule::default().budget_for(variant)
    }
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

pub struct HttpGenerationClient {
    api: GenerationApi,
    timeouts: TimeoutSchedule,
    agent_mode: bool,
    skip_upstream_cache: bool,
}

impl HttpGenerationClient {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            api: GenerationApi::new(config.base_url.clone(), config.api_key.clone()),
            timeouts: config.timeouts,
            agent_mode: config.agent_mode,
            skip_upstream_cache: config.skip_upstream_cache,
        }
    }

    fn classify(err: GenerationApiError, budget: Duration) -> GenerationError {
        match err {
            GenerationApiError::Request(e) if e.is_timeout() => GenerationError::Timeout(budget),
            GenerationApiError::Request(e) => GenerationError::Transport(e.to_string()),
            GenerationApiError::ApiError { status: 429, .. } => GenerationError::RateLimited,
            GenerationApiError::ApiError { status, body } => {
                let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
                GenerationError::Transport(format!("HTTP {status}: {body}"))
            }
            GenerationApiError::Decode(msg) => GenerationError::MalformedResponse(msg),
        }
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate(
        &self,
        variant: &VariantDescriptor,
        source_summary: &str,
        diagram_type: DiagramType,
    ) -> Result<String, GenerationError> {
        let budget = self.timeout_for(variant);
        let request = InvokeRequest {
            prompt: build_prompt(variant, source_summary, diagram_type),
            diagram_type: diagram_type.as_str().to_string(),
            skip_cache: self.skip_upstream_cache,
            agent_mode: self.agent_mode,
        };
        let function_id = diagram_type.function_id();

        tracing::debug!(
            variant_id = variant.id,
            function_id = %function_id,
            budget_secs = budget.as_secs(),
            "Invoking generation service",
        );

        let response =
            match tokio::time::timeout(budget, self.api.invoke(&function_id, &request, budget))
                .await
            {
                Err(_) => return Err(GenerationError::Timeout(budget)),
                Ok(result) => result.map_err(|e| Self::classify(e, budget))?,
            };

        response.into_payload().ok_or_else(|| {
            GenerationError::MalformedResponse("response has no payload".to_string())
        })
    }

    fn timeout_for(&self, variant: &VariantDescriptor) -> Duration {
        self.timeouts.budget_for(variant)
    }
}
