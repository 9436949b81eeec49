use std::time::Duration;

use variantflow_core::config::{env_flag, env_opt, env_or, ConfigError};

use crate::timeouts::{
    TimeoutSchedule, DEFAULT_ADVANCED_SECS, DEFAULT_BASIC_SECS, DEFAULT_INTERMEDIATE_EXTENDED_SECS,
    DEFAULT_INTERMEDIATE_SECS,
};

/// Generation service configuration.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub base_url: String,
    /// Sent as a bearer token when set.
    pub api_key: Option<String>,
    pub agent_mode: bool,
    /// Ask the service to bypass its own response cache.
    pub skip_upstream_cache: bool,
    pub timeouts: TimeoutSchedule,
}

impl GenerationConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                              | Default                  |
    /// |--------------------------------------|--------------------------|
    /// | `GENERATION_BASE_URL`                | `http://localhost:54321` |
    /// | `GENERATION_API_KEY`                 | unset                    |
    /// | `AGENT_MODE`                         | `false`                  |
    /// | `SKIP_UPSTREAM_CACHE`                | `true`                   |
    /// | `TIMEOUT_BASIC_SECS`                 | `45`                     |
    /// | `TIMEOUT_INTERMEDIATE_SECS`          | `90`                     |
    /// | `TIMEOUT_INTERMEDIATE_EXTENDED_SECS` | `105`                    |
    /// | `TIMEOUT_ADVANCED_SECS`              | `120`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            env_opt("GENERATION_BASE_URL").unwrap_or_else(|| "http://localhost:54321".into());
        let secs = |key, default| env_or(key, default, "u64").map(Duration::from_secs);

        Ok(Self {
            base_url,
            api_key: env_opt("GENERATION_API_KEY"),
            agent_mode: env_flag("AGENT_MODE", false)?,
            skip_upstream_cache: env_flag("SKIP_UPSTREAM_CACHE", true)?,
            timeouts: TimeoutSchedule {
                basic: secs("TIMEOUT_BASIC_SECS", DEFAULT_BASIC_SECS)?,
                intermediate: secs("TIMEOUT_INTERMEDIATE_SECS", DEFAULT_INTERMEDIATE_SECS)?,
                intermediate_extended: secs(
                    "TIMEOUT_INTERMEDIATE_EXTENDED_SECS",
                    DEFAULT_INTERMEDIATE_EXTENDED_SECS,
                )?,
                advanced: secs("TIMEOUT_ADVANCED_SECS", DEFAULT_ADVANCED_SECS)?,
            },
        })
    }
}
