//! Tier-aware structural validation of generated candidates.
//!
//! Warnings flag a mismatch between the requested tier and the structure
//! actually produced. Errors flag payloads that are not usable diagrams.
//! Neither blocks acceptance of a candidate.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::metrics::{analyze_structure, infer_tier, DiagramStructure};
use crate::tier::ComplexityTier;

// ---------------------------------------------------------------------------
// Finding codes
// ---------------------------------------------------------------------------

/// Payload could not be parsed.
pub const CODE_PARSE_ERROR: &str = "parse_error";
/// Structure does not match the requested tier.
pub const CODE_STRUCTURAL_WARNING: &str = "structural_warning";
/// Structure is broken (e.g. a sequence flow without endpoints).
pub const CODE_STRUCTURAL_ERROR: &str = "structural_error";

/// Elements every diagram needs, besides the `definitions` root.
const REQUIRED_ELEMENTS: [&str; 3] = ["process", "startEvent", "endEvent"];

/// Misspelled BPMN prefixes on element tags.
static BAD_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?(bpmns|BPMN):").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFinding {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
}

impl ValidationFinding {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: CODE_STRUCTURAL_WARNING,
            message: message.into(),
        }
    }

    fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }
}

/// All findings for one candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<ValidationFinding>,
}

impl ValidationReport {
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate `payload` against the structural expectations of `requested_tier`.
pub fn validate_candidate(requested_tier: ComplexityTier, payload: &str) -> ValidationReport {
    let structure = match analyze_structure(payload) {
        Ok(s) => s,
        Err(e) => {
            return ValidationReport {
                findings: vec![ValidationFinding::error(
                    CODE_PARSE_ERROR,
                    format!("Payload could not be parsed: {e}"),
                )],
            };
        }
    };

    let mut findings = document_warnings(payload, &structure);
    findings.extend(tier_warnings(requested_tier, &structure));

    for flow in &structure.dangling_flows {
        let id = flow.id.as_deref().unwrap_or("<unnamed>");
        if flow.missing_source {
            findings.push(ValidationFinding::error(
                CODE_STRUCTURAL_ERROR,
                format!("sequenceFlow '{id}' missing required attribute: sourceRef"),
            ));
        }
        if flow.missing_target {
            findings.push(ValidationFinding::error(
                CODE_STRUCTURAL_ERROR,
                format!("sequenceFlow '{id}' missing required attribute: targetRef"),
            ));
        }
    }

    ValidationReport { findings }
}

/// Shape checks that apply to every tier.
fn document_warnings(payload: &str, s: &DiagramStructure) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();

    let present = [
        s.has_definitions_root,
        s.process_count > 0,
        s.start_event_count > 0,
        s.end_event_count > 0,
    ];
    for (element, found) in ["definitions"].iter().chain(&REQUIRED_ELEMENTS).zip(present) {
        if !found {
            findings.push(ValidationFinding::warning(format!(
                "Missing required element: {element}"
            )));
        }
    }

    if !s.namespaced {
        findings.push(ValidationFinding::warning("Missing namespace declaration"));
    }

    let bad_prefixes: BTreeSet<&str> = BAD_PREFIX_RE
        .captures_iter(payload)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    for prefix in bad_prefixes {
        findings.push(ValidationFinding::warning(format!(
            "Invalid namespace prefix: {prefix}: (should be bpmn:)"
        )));
    }

    if s.stray_flow_node_refs > 0 {
        findings.push(ValidationFinding::warning(format!(
            "{} flowNodeRef element(s) outside a lane",
            s.stray_flow_node_refs
        )));
    }

    findings
}

fn tier_warnings(tier: ComplexityTier, s: &DiagramStructure) -> Vec<ValidationFinding> {
    let inferred = infer_tier(s);
    let looks_like = format!("structure looks {inferred}");

    match tier {
        ComplexityTier::Basic => {
            let present = [
                (s.gateway_count() > 0, "gateways"),
                (s.subprocess_count > 0, "sub-processes"),
                (s.decision_gateway_count > 0, "decision points"),
                (s.has_pools_or_lanes(), "pools or lanes"),
                (s.artifact_count > 0, "artifacts"),
            ];
            present
                .into_iter()
                .filter(|(found, _)| *found)
                .map(|(_, category)| {
                    ValidationFinding::warning(format!(
                        "Basic variant contains {category}; expected a linear flow ({looks_like})"
                    ))
                })
                .collect()
        }
        ComplexityTier::Intermediate => {
            let structured = s.gateway_count() > 0
                || s.subprocess_count > 0
                || s.intermediate_event_count > 0
                || s.parallel_gateway_count > 0;
            if structured {
                Vec::new()
            } else {
                vec![ValidationFinding::warning(format!(
                    "Intermediate variant has no gateway, sub-process, intermediate event \
                     or parallel branch ({looks_like})"
                ))]
            }
        }
        ComplexityTier::Advanced => {
            let has_markers = s.boundary_event_count > 0
                || s.artifact_count > 0
                || s.service_task_count > 0
                || s.has_multiple_pools_or_lanes();
            // A flow with no gateways, pools or lanes is not judged here.
            let has_structure = s.gateway_count() > 0 || s.has_pools_or_lanes();
            if !has_structure || has_markers || s.gateway_count() >= 2 {
                Vec::new()
            } else {
                vec![ValidationFinding::warning(format!(
                    "Advanced variant has sparse structure: no boundary events, artifacts, \
                     service tasks or multiple pools/lanes, and fewer than 2 gateways ({looks_like})"
                ))]
            }
        }
    }
}
