use std::path::PathBuf;

use variantflow_core::config::{env_opt, ConfigError};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Where candidate payloads and previews are written.
    pub output_dir: PathBuf,
    /// Postgres URL for the generation cache. In-memory when unset.
    pub database_url: Option<String>,
    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var        | Default     |
    /// |----------------|-------------|
    /// | `OUTPUT_DIR`   | `./output`  |
    /// | `DATABASE_URL` | unset       |
    /// | `LOG_FORMAT`   | `text`      |
    pub fn from_env() -> Result<Self, ConfigError> {
        let log_json = match env_opt("LOG_FORMAT").as_deref() {
            None | Some("text") | Some("pretty") => false,
            Some("json") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    expected: "log format (text, json)",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            output_dir: env_opt("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./output")),
            database_url: env_opt("DATABASE_URL"),
            log_json,
        })
    }
}
