use std::time::Duration;

use variantflow_core::candidate::GenerationFailureKind;

/// A failed generation attempt. Failures are terminal per attempt; the
/// client never retries.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Generation service rate limit reached")]
    RateLimited,

    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("Generation transport error: {0}")]
    Transport(String),
}

impl GenerationError {
    pub fn kind(&self) -> GenerationFailureKind {
        match self {
            GenerationError::Timeout(_) => GenerationFailureKind::Timeout,
            GenerationError::RateLimited => GenerationFailureKind::RateLimited,
            GenerationError::MalformedResponse(_) => GenerationFailureKind::MalformedResponse,
            GenerationError::Transport(_) => GenerationFailureKind::TransportError,
        }
    }
}
