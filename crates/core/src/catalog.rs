//! Static variant catalog and tier-distribution selection.
//!
//! The catalog is fixed at compile time. [`select_variants`] composes a
//! batch of `k` descriptors that approximates a target ratio of tiers, so
//! any batch size is well-defined (not just 3, 5 or 7).

use crate::error::CoreError;
use crate::tier::{ComplexityTier, DiagramType};

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Immutable description of one alternative the generator can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub complexity_tier: ComplexityTier,
    pub instructions_by_diagram_type: &'static [(DiagramType, &'static str)],
    /// Transformation-heavy variants get the extended intermediate timeout.
    pub extended_timeout: bool,
}

impl VariantDescriptor {
    /// Generation instructions for a diagram type.
    ///
    /// Falls back to the variant description when the catalog has no
    /// dedicated instructions for `diagram_type`.
    pub fn instructions(&self, diagram_type: DiagramType) -> &'static str {
        self.instructions_by_diagram_type
            .iter()
            .find(|(dt, _)| *dt == diagram_type)
            .map(|(_, text)| *text)
            .unwrap_or(self.description)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The built-in catalog, in catalog order.
pub const CATALOG: &[VariantDescriptor] = &[
    VariantDescriptor {
        id: "linear-essentials",
        title: "Streamlined Linear",
        description: "The shortest faithful sequence of steps from start to end.",
        complexity_tier: ComplexityTier::Basic,
        instructions_by_diagram_type: &[
            (
                DiagramType::Bpmn,
                "Reduce the process to a single straight sequence of tasks between one \
                 start event and one end event. Merge trivial steps.",
            ),
            (
                DiagramType::Pid,
                "Reduce the flow to a single line of equipment and instruments with no \
                 bypasses or recycle loops.",
            ),
        ],
        extended_timeout: false,
    },
    VariantDescriptor {
        id: "happy-path",
        title: "Happy Path",
        description: "Only the successful path, with every exception removed.",
        complexity_tier: ComplexityTier::Basic,
        instructions_by_diagram_type: &[(
            DiagramType::Bpmn,
            "Keep only the path where every step succeeds. Drop error handling, \
             rejections and escalations.",
        )],
        extended_timeout: false,
    },
    VariantDescriptor {
        id: "decision-driven",
        title: "Decision Driven",
        description: "Makes the key business decisions explicit with gateways.",
        complexity_tier: ComplexityTier::Intermediate,
        instructions_by_diagram_type: &[
            (
                DiagramType::Bpmn,
                "Identify the main decisions and model each with an exclusive gateway \
                 and clearly labelled outgoing flows.",
            ),
            (
                DiagramType::Pid,
                "Make control decisions explicit with control valves and labelled \
                 instrument loops.",
            ),
        ],
        extended_timeout: false,
    },
    VariantDescriptor {
        id: "parallel-streams",
        title: "Parallel Streams",
        description: "Runs independent work concurrently.",
        complexity_tier: ComplexityTier::Intermediate,
        instructions_by_diagram_type: &[(
            DiagramType::Bpmn,
            "Find steps that do not depend on each other and run them between a \
             diverging and a converging parallel gateway.",
        )],
        extended_timeout: false,
    },
    VariantDescriptor {
        id: "exception-aware",
        title: "Exception Aware",
        description: "Adds timers and intermediate events for waiting and escalation.",
        complexity_tier: ComplexityTier::Intermediate,
        instructions_by_diagram_type: &[(
            DiagramType::Bpmn,
            "Add intermediate timer or message events where the process waits, and \
             route overdue work to an escalation task.",
        )],
        extended_timeout: false,
    },
    VariantDescriptor {
        id: "data-transformation",
        title: "Transformation Pipeline",
        description: "Restructures the process around data transformation stages.",
        complexity_tier: ComplexityTier::Intermediate,
        instructions_by_diagram_type: &[(
            DiagramType::Bpmn,
            "Reorganise the process into extract, transform and load stages, using \
             sub-processes for each stage and data objects for intermediate results.",
        )],
        extended_timeout: true,
    },
    VariantDescriptor {
        id: "orchestrated-services",
        title: "Service Orchestration",
        description: "Automates steps as service tasks with error boundaries.",
        complexity_tier: ComplexityTier::Advanced,
        instructions_by_diagram_type: &[
            (
                DiagramType::Bpmn,
                "Automate every step that can be a service task, attach error boundary \
                 events to them, and route failures to compensation or manual handling.",
            ),
            (
                DiagramType::Pid,
                "Add full instrumentation, interlocks and safety relief paths.",
            ),
        ],
        extended_timeout: false,
    },
    VariantDescriptor {
        id: "multi-participant",
        title: "Multi Participant",
        description: "Separates responsibilities into pools and lanes.",
        complexity_tier: ComplexityTier::Advanced,
        instructions_by_diagram_type: &[(
            DiagramType::Bpmn,
            "Assign each task to a lane per role, use separate pools for external \
             parties, and connect them with message flows.",
        )],
        extended_timeout: false,
    },
    VariantDescriptor {
        id: "resilient-compensation",
        title: "Resilient Compensation",
        description: "Full error, timeout and compensation handling.",
        complexity_tier: ComplexityTier::Advanced,
        instructions_by_diagram_type: &[(
            DiagramType::Bpmn,
            "Model timeouts with boundary timer events, failures with error events, \
             and undo work with compensation activities.",
        )],
        extended_timeout: false,
    },
];

/// Look up a built-in descriptor by id.
pub fn find_variant(id: &str) -> Option<&'static VariantDescriptor> {
    CATALOG.iter().find(|v| v.id == id)
}

// ---------------------------------------------------------------------------
// Tier distribution
// ---------------------------------------------------------------------------

/// Guards float quotas such as `0.4 * 5 / 1.0000000000000002` against
/// landing just below an integer.
const QUOTA_EPSILON: f64 = 1e-9;

/// Target share of each tier in a batch. Ratios need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierDistribution {
    pub basic: f64,
    pub intermediate: f64,
    pub advanced: f64,
}

impl Default for TierDistribution {
    fn default() -> Self {
        Self {
            basic: 0.2,
            intermediate: 0.4,
            advanced: 0.4,
        }
    }
}

impl TierDistribution {
    fn weight(&self, tier: ComplexityTier) -> f64 {
        let w = match tier {
            ComplexityTier::Basic => self.basic,
            ComplexityTier::Intermediate => self.intermediate,
            ComplexityTier::Advanced => self.advanced,
        };
        if w.is_finite() && w > 0.0 {
            w
        } else {
            0.0
        }
    }

    /// Per-tier slot counts for a batch of `k`, using the largest-remainder
    /// method. Remainder ties go to the lower tier. Counts always sum to `k`.
    pub fn targets(&self, k: usize) -> [usize; 3] {
        let mut weights = ComplexityTier::ALL.map(|t| self.weight(t));
        let mut total: f64 = weights.iter().sum();
        if total <= 0.0 {
            weights = [1.0; 3];
            total = 3.0;
        }

        let quotas = weights.map(|w| w * k as f64 / total);
        let mut counts = quotas.map(|q| (q + QUOTA_EPSILON).floor() as usize);
        let assigned: usize = counts.iter().sum();

        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| {
            let fa = quotas[a] - counts[a] as f64;
            let fb = quotas[b] - counts[b] as f64;
            fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
        });

        for &idx in order.iter().cycle().take(k.saturating_sub(assigned)) {
            counts[idx] += 1;
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Select `k` descriptors from the built-in [`CATALOG`].
pub fn select_variants(
    k: usize,
    distribution: &TierDistribution,
) -> Result<Vec<VariantDescriptor>, CoreError> {
    select_from(CATALOG, k, distribution)
}

/// Select `k` descriptors from `catalog` approximating `distribution`.
///
/// - Each tier contributes its first `target` descriptors in catalog order.
/// - Slots a tier cannot fill go to unused descriptors in catalog order.
/// - The result keeps catalog order and has exactly `min(k, catalog.len())`
///   items.
pub fn select_from(
    catalog: &[VariantDescriptor],
    k: usize,
    distribution: &TierDistribution,
) -> Result<Vec<VariantDescriptor>, CoreError> {
    if k == 0 {
        return Err(CoreError::Validation(
            "Batch size must be at least 1".to_string(),
        ));
    }

    let k = k.min(catalog.len());
    let targets = distribution.targets(k);
    let mut picked = vec![false; catalog.len()];

    for (tier, target) in ComplexityTier::ALL.iter().zip(targets) {
        catalog
            .iter()
            .enumerate()
            .filter(|(_, v)| v.complexity_tier == *tier)
            .take(target)
            .for_each(|(i, _)| picked[i] = true);
    }

    let mut missing = k - picked.iter().filter(|p| **p).count();
    for slot in picked.iter_mut() {
        if missing == 0 {
            break;
        }
        if !*slot {
            *slot = true;
            missing -= 1;
        }
    }

    Ok(catalog
        .iter()
        .zip(picked)
        .filter(|(_, p)| *p)
        .map(|(v, _)| v.clone())
        .collect())
}
