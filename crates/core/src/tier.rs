//! Complexity tiers and diagram types.
//!
//! A tier drives both the generation prompt's constraints and the
//! validator's structural expectations. The tier stored on a candidate is
//! always the one its variant requested.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// ComplexityTier
// ---------------------------------------------------------------------------

/// Requested complexity level of a generated variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Basic,
    Intermediate,
    Advanced,
}

impl ComplexityTier {
    /// All tiers, in ascending order of complexity.
    pub const ALL: [ComplexityTier; 3] = [
        ComplexityTier::Basic,
        ComplexityTier::Intermediate,
        ComplexityTier::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityTier::Basic => "basic",
            ComplexityTier::Intermediate => "intermediate",
            ComplexityTier::Advanced => "advanced",
        }
    }

    /// Human-readable constraint text appended to generation prompts.
    pub fn prompt_constraints(&self) -> &'static str {
        match self {
            ComplexityTier::Basic => {
                "Produce a strictly linear sequence: no gateways, no sub-processes, \
                 no pools or lanes, no artifacts."
            }
            ComplexityTier::Intermediate => {
                "Introduce meaningful structure: at least one gateway, sub-process, \
                 intermediate event or parallel branch."
            }
            ComplexityTier::Advanced => {
                "Model the process in depth: multiple gateways, boundary events for \
                 error handling, service tasks, and pools or lanes where participants differ."
            }
        }
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplexityTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(ComplexityTier::Basic),
            "intermediate" => Ok(ComplexityTier::Intermediate),
            "advanced" => Ok(ComplexityTier::Advanced),
            other => Err(CoreError::Validation(format!(
                "Invalid complexity tier '{other}'. Must be one of: basic, intermediate, advanced"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// DiagramType
// ---------------------------------------------------------------------------

/// Kind of diagram a batch generates. Selects the upstream function and the
/// per-type instructions of each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramType {
    Bpmn,
    Pid,
}

impl DiagramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramType::Bpmn => "bpmn",
            DiagramType::Pid => "pid",
        }
    }

    /// Identifier of the upstream generation function, e.g. `generate-bpmn`.
    pub fn function_id(&self) -> String {
        format!("generate-{}", self.as_str())
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bpmn" => Ok(DiagramType::Bpmn),
            "pid" => Ok(DiagramType::Pid),
            other => Err(CoreError::Validation(format!(
                "Invalid diagram type '{other}'. Must be one of: bpmn, pid"
            ))),
        }
    }
}
