//! Structural metrics extraction from BPMN payloads.
//!
//! The payload is only inspected, never re-serialized. Elements are matched
//! on their local name so any namespace prefix (`bpmn:`, `bpmn2:`, none)
//! works the same.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::tier::ComplexityTier;

// ---------------------------------------------------------------------------
// Element categories
// ---------------------------------------------------------------------------

pub const TASK_ELEMENTS: &[&str] = &[
    "task",
    "userTask",
    "serviceTask",
    "scriptTask",
    "manualTask",
    "businessRuleTask",
    "sendTask",
    "receiveTask",
    "callActivity",
];

pub const DECISION_GATEWAYS: &[&str] = &[
    "exclusiveGateway",
    "inclusiveGateway",
    "eventBasedGateway",
    "complexGateway",
];

pub const PARALLEL_GATEWAY: &str = "parallelGateway";

const SUBPROCESS_ELEMENTS: &[&str] = &["subProcess", "transaction", "adHocSubProcess"];

const EVENT_ELEMENTS: &[&str] = &[
    "startEvent",
    "endEvent",
    "intermediateCatchEvent",
    "intermediateThrowEvent",
    "boundaryEvent",
];

const ARTIFACT_ELEMENTS: &[&str] = &[
    "textAnnotation",
    "group",
    "association",
    "dataObject",
    "dataObjectReference",
    "dataStoreReference",
];

const EVENT_DEFINITION_SUFFIX: &str = "EventDefinition";

/// Sentinel reported when a diagram declares no typed events.
pub const NO_EVENT_TYPES: &str = "none";

fn is_flow_element(name: &str) -> bool {
    TASK_ELEMENTS.contains(&name)
        || DECISION_GATEWAYS.contains(&name)
        || name == PARALLEL_GATEWAY
        || SUBPROCESS_ELEMENTS.contains(&name)
        || EVENT_ELEMENTS.contains(&name)
        || name == "sequenceFlow"
}

// ---------------------------------------------------------------------------
// StructuralMetrics
// ---------------------------------------------------------------------------

/// Counts computed from a candidate payload.
///
/// `event_types` is never empty and `estimated_paths` is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralMetrics {
    pub task_count: u32,
    pub decision_points: u32,
    pub parallel_branches: u32,
    pub error_handlers: u32,
    pub event_types: Vec<String>,
    pub estimated_paths: u64,
}

impl Default for StructuralMetrics {
    fn default() -> Self {
        Self {
            task_count: 0,
            decision_points: 0,
            parallel_branches: 0,
            error_handlers: 0,
            event_types: vec![NO_EVENT_TYPES.to_string()],
            estimated_paths: 1,
        }
    }
}

/// Extract metrics from a payload. Never fails: unparseable input yields
/// [`StructuralMetrics::default`].
pub fn extract_metrics(payload: &str) -> StructuralMetrics {
    match analyze_structure(payload) {
        Ok(structure) => structure.metrics(),
        Err(e) => {
            tracing::debug!(error = %e, "Payload not parseable, using empty metrics");
            StructuralMetrics::default()
        }
    }
}

// ---------------------------------------------------------------------------
// DiagramStructure
// ---------------------------------------------------------------------------

/// A sequence flow lacking one or both endpoint references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingFlow {
    /// The flow's `id`, or `None` when it has none.
    pub id: Option<String>,
    pub missing_source: bool,
    pub missing_target: bool,
}

/// Presence counts parsed from a payload in a single pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramStructure {
    pub task_count: u32,
    pub service_task_count: u32,
    /// Distinct task element kinds, in first-seen order.
    pub task_kinds: Vec<String>,
    /// Task labels in document order (`name`, falling back to `id`).
    pub task_names: Vec<String>,
    pub decision_gateway_count: u32,
    pub parallel_gateway_count: u32,
    pub subprocess_count: u32,
    pub event_subprocess_count: u32,
    pub start_event_count: u32,
    pub end_event_count: u32,
    pub intermediate_event_count: u32,
    pub boundary_event_count: u32,
    pub pool_count: u32,
    pub lane_count: u32,
    pub artifact_count: u32,
    pub sequence_flow_count: u32,
    pub process_count: u32,
    /// The root element is `definitions`.
    pub has_definitions_root: bool,
    /// The root element is bound to a namespace.
    pub namespaced: bool,
    /// `flowNodeRef` elements outside a `lane`.
    pub stray_flow_node_refs: u32,
    /// Flow nodes plus sequence flows.
    pub flow_element_count: u32,
    /// Event definition kinds with the `EventDefinition` suffix stripped.
    pub event_kinds: Vec<String>,
    pub estimated_paths: u64,
    pub dangling_flows: Vec<DanglingFlow>,
}

impl DiagramStructure {
    pub fn gateway_count(&self) -> u32 {
        self.decision_gateway_count + self.parallel_gateway_count
    }

    pub fn error_handler_count(&self) -> u32 {
        self.boundary_event_count + self.event_subprocess_count
    }

    pub fn has_pools_or_lanes(&self) -> bool {
        self.pool_count > 0 || self.lane_count > 0
    }

    pub fn has_multiple_pools_or_lanes(&self) -> bool {
        self.pool_count > 1 || self.lane_count > 1
    }

    pub fn metrics(&self) -> StructuralMetrics {
        let event_types = if self.event_kinds.is_empty() {
            vec![NO_EVENT_TYPES.to_string()]
        } else {
            self.event_kinds.clone()
        };
        StructuralMetrics {
            task_count: self.task_count,
            decision_points: self.decision_gateway_count,
            parallel_branches: self.parallel_gateway_count,
            error_handlers: self.error_handler_count(),
            event_types,
            estimated_paths: self.estimated_paths.max(1),
        }
    }
}

/// Parse `payload` and collect its [`DiagramStructure`].
///
/// `estimated_paths` is a coarse approximation: it starts at 1 and each
/// decision gateway doubles it, while each parallel gateway multiplies it
/// by `max(2, outgoing flows)`. It does not enumerate real paths.
pub fn analyze_structure(payload: &str) -> Result<DiagramStructure, CoreError> {
    let doc = roxmltree::Document::parse(payload).map_err(|e| CoreError::Parse(e.to_string()))?;

    let root = doc.root_element();
    let mut s = DiagramStructure {
        has_definitions_root: root.tag_name().name() == "definitions",
        namespaced: root.tag_name().namespace().is_some(),
        ..DiagramStructure::default()
    };
    let mut outgoing: HashMap<&str, usize> = HashMap::new();
    let mut gateways: Vec<(Option<&str>, bool)> = Vec::new();

    for node in doc.descendants().filter(|n| n.is_element()) {
        let name = node.tag_name().name();

        if is_flow_element(name) {
            s.flow_element_count += 1;
        }

        if TASK_ELEMENTS.contains(&name) {
            s.task_count += 1;
            if name == "serviceTask" {
                s.service_task_count += 1;
            }
            if !s.task_kinds.iter().any(|k| k == name) {
                s.task_kinds.push(name.to_string());
            }
            if let Some(label) = node.attribute("name").or_else(|| node.attribute("id")) {
                s.task_names.push(label.trim().to_string());
            }
            continue;
        }

        if DECISION_GATEWAYS.contains(&name) {
            s.decision_gateway_count += 1;
            gateways.push((node.attribute("id"), false));
            continue;
        }

        if let Some(kind) = name.strip_suffix(EVENT_DEFINITION_SUFFIX) {
            if !kind.is_empty() && !s.event_kinds.iter().any(|k| k == kind) {
                s.event_kinds.push(kind.to_string());
            }
            continue;
        }

        match name {
            PARALLEL_GATEWAY => {
                s.parallel_gateway_count += 1;
                gateways.push((node.attribute("id"), true));
            }
            "subProcess" | "transaction" | "adHocSubProcess" => {
                s.subprocess_count += 1;
                if node.attribute("triggeredByEvent") == Some("true") {
                    s.event_subprocess_count += 1;
                }
            }
            "process" => s.process_count += 1,
            "flowNodeRef" => {
                let in_lane = node
                    .parent_element()
                    .is_some_and(|p| p.tag_name().name() == "lane");
                if !in_lane {
                    s.stray_flow_node_refs += 1;
                }
            }
            "startEvent" => s.start_event_count += 1,
            "endEvent" => s.end_event_count += 1,
            "intermediateCatchEvent" | "intermediateThrowEvent" => {
                s.intermediate_event_count += 1
            }
            "boundaryEvent" => s.boundary_event_count += 1,
            "participant" => s.pool_count += 1,
            "lane" => s.lane_count += 1,
            "sequenceFlow" => {
                s.sequence_flow_count += 1;
                let source = node.attribute("sourceRef").filter(|v| !v.trim().is_empty());
                let target = node.attribute("targetRef").filter(|v| !v.trim().is_empty());
                if let Some(source) = source {
                    *outgoing.entry(source).or_default() += 1;
                }
                if source.is_none() || target.is_none() {
                    s.dangling_flows.push(DanglingFlow {
                        id: node.attribute("id").map(str::to_string),
                        missing_source: source.is_none(),
                        missing_target: target.is_none(),
                    });
                }
            }
            other if ARTIFACT_ELEMENTS.contains(&other) => s.artifact_count += 1,
            _ => {}
        }
    }

    s.estimated_paths = gateways.iter().fold(1u64, |paths, (id, parallel)| {
        let factor = if *parallel {
            let out = id.and_then(|id| outgoing.get(id)).copied().unwrap_or(0);
            out.max(2) as u64
        } else {
            2
        };
        paths.saturating_mul(factor)
    });

    Ok(s)
}

// ---------------------------------------------------------------------------
// Complexity class
// ---------------------------------------------------------------------------

/// Element-count classification used to route previews to the remote tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityClass {
    Simple,
    Intermediate,
    Complex,
    VeryComplex,
}

impl ComplexityClass {
    pub fn from_element_count(count: u32) -> Self {
        match count {
            0..=20 => ComplexityClass::Simple,
            21..=50 => ComplexityClass::Intermediate,
            51..=100 => ComplexityClass::Complex,
            _ => ComplexityClass::VeryComplex,
        }
    }

    /// Whether diagrams of this class warrant the remote render tier.
    pub fn is_heavy(&self) -> bool {
        matches!(self, ComplexityClass::Complex | ComplexityClass::VeryComplex)
    }
}

/// Opening tag with an optional namespace prefix; captures the local name.
static OPENING_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:[A-Za-z_][\w.-]*:)?([A-Za-z_][\w.-]*)").expect("valid regex"));

/// Classify a payload by its flow-element count.
///
/// Unparseable payloads are classified from a tag count over the raw text.
pub fn classify_complexity(payload: &str) -> ComplexityClass {
    let count = match analyze_structure(payload) {
        Ok(s) => s.flow_element_count,
        Err(_) => OPENING_TAG_RE
            .captures_iter(payload)
            .filter(|c| is_flow_element(&c[1]))
            .count() as u32,
    };
    ComplexityClass::from_element_count(count)
}

/// Advisory tier guess from parsed structure. Never overrides a requested tier.
pub fn infer_tier(structure: &DiagramStructure) -> ComplexityTier {
    let advanced = structure.boundary_event_count > 0
        || structure.service_task_count > 0
        || structure.has_multiple_pools_or_lanes()
        || structure.gateway_count() >= 3;
    if advanced {
        return ComplexityTier::Advanced;
    }

    let intermediate = structure.gateway_count() > 0
        || structure.subprocess_count > 0
        || structure.intermediate_event_count > 0;
    if intermediate {
        ComplexityTier::Intermediate
    } else {
        ComplexityTier::Basic
    }
}
