use std::time::Duration;

use variantflow_core::config::{env_opt, env_or, ConfigError};

use crate::outcome::RenderSize;

/// Preview pipeline configuration.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Budget for each engine tier.
    pub tier_timeout: Duration,
    /// Pause between the primary and secondary attempts.
    pub settle_delay: Duration,
    pub cache_ttl: Duration,
    pub primary_size: RenderSize,
    pub secondary_size: RenderSize,
    /// Remote renderer endpoint; the remote tier is skipped when unset.
    pub remote_url: Option<String>,
    pub remote_timeout: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            tier_timeout: Duration::from_millis(5_000),
            settle_delay: Duration::from_millis(500),
            cache_ttl: Duration::from_secs(300),
            primary_size: RenderSize::new(800, 600),
            secondary_size: RenderSize::new(1600, 1200),
            remote_url: None,
            remote_timeout: Duration::from_millis(10_000),
        }
    }
}

impl PreviewConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `PREVIEW_TIER_TIMEOUT_MS`  | `5000`  |
    /// | `PREVIEW_SETTLE_MS`        | `500`   |
    /// | `PREVIEW_CACHE_TTL_SECS`   | `300`   |
    /// | `REMOTE_RENDER_URL`        | unset   |
    /// | `REMOTE_RENDER_TIMEOUT_MS` | `10000` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let millis = |key, default| env_or(key, default, "u64").map(Duration::from_millis);

        Ok(Self {
            tier_timeout: millis("PREVIEW_TIER_TIMEOUT_MS", 5_000)?,
            settle_delay: millis("PREVIEW_SETTLE_MS", 500)?,
            cache_ttl: env_or("PREVIEW_CACHE_TTL_SECS", 300u64, "u64").map(Duration::from_secs)?,
            remote_url: env_opt("REMOTE_RENDER_URL"),
            remote_timeout: millis("REMOTE_RENDER_TIMEOUT_MS", 10_000)?,
            ..defaults
        })
    }
}
