use variantflow_core::catalog::TierDistribution;
use variantflow_core::config::{env_flag, env_or, ConfigError};
use variantflow_core::tier::DiagramType;
use variantflow_core::types::OwnerId;

/// Batch defaults for one worker run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub owner_id: OwnerId,
    pub diagram_type: DiagramType,
    pub variant_count: usize,
    pub distribution: TierDistribution,
    /// Skip the generation cache lookup.
    pub force_refresh: bool,
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var         | Default |
    /// |-----------------|---------|
    /// | `OWNER_ID`      | `1`     |
    /// | `DIAGRAM_TYPE`  | `bpmn`  |
    /// | `VARIANT_COUNT` | `5`     |
    /// | `FORCE_REFRESH` | `false` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let variant_count: usize = env_or("VARIANT_COUNT", 5, "positive integer")?;
        if variant_count == 0 {
            return Err(ConfigError::Invalid {
                key: "VARIANT_COUNT",
                expected: "positive integer",
                value: "0".into(),
            });
        }

        Ok(Self {
            owner_id: env_or("OWNER_ID", 1, "i64")?,
            diagram_type: env_or("DIAGRAM_TYPE", DiagramType::Bpmn, "diagram type (bpmn, pid)")?,
            variant_count,
            distribution: TierDistribution::default(),
            force_refresh: env_flag("FORCE_REFRESH", false)?,
        })
    }
}
