//! Per-tier generation timeout schedule.
//!
//! Higher tiers produce longer prompts and larger diagrams, so the upstream
//! service takes measurably longer to answer them.

use std::time::Duration;

use variantflow_core::catalog::VariantDescriptor;
use variantflow_core::tier::ComplexityTier;

pub const DEFAULT_BASIC_SECS: u64 = 45;
pub const DEFAULT_INTERMEDIATE_SECS: u64 = 90;
pub const DEFAULT_INTERMEDIATE_EXTENDED_SECS: u64 = 105;
pub const DEFAULT_ADVANCED_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSchedule {
    pub basic: Duration,
    pub intermediate: Duration,
    /// Intermediate variants flagged `extended_timeout`.
    pub intermediate_extended: Duration,
    pub advanced: Duration,
}

impl Default for TimeoutSchedule {
    fn default() -> Self {
        Self {
            basic: Duration::from_secs(DEFAULT_BASIC_SECS),
            intermediate: Duration::from_secs(DEFAULT_INTERMEDIATE_SECS),
            intermediate_extended: Duration::from_secs(DEFAULT_INTERMEDIATE_EXTENDED_SECS),
            advanced: Duration::from_secs(DEFAULT_ADVANCED_SECS),
        }
    }
}

impl TimeoutSchedule {
    /// Same budget for every tier. Handy in tests.
    pub fn uniform(budget: Duration) -> Self {
        Self {
            basic: budget,
            intermediate: budget,
            intermediate_extended: budget,
            advanced: budget,
        }
    }

    pub fn budget_for(&self, variant: &VariantDescriptor) -> Duration {
        match variant.complexity_tier {
            ComplexityTier::Basic => self.basic,
            ComplexityTier::Intermediate if variant.extended_timeout => self.intermediate_extended,
            ComplexityTier::Intermediate => self.intermediate,
            ComplexityTier::Advanced => self.advanced,
        }
    }
}
