//! Prompt construction for one variant.

use variantflow_core::catalog::VariantDescriptor;
use variantflow_core::metrics::analyze_structure;
use variantflow_core::tier::DiagramType;

/// Most task names listed in a source summary.
const MAX_SUMMARY_TASKS: usize = 40;

/// Raw-text fallback length when the source does not parse.
const MAX_RAW_SUMMARY_CHARS: usize = 4000;

/// Condense a source diagram into the text sent with every variant request.
///
/// Parseable diagrams become a list of steps plus a structure line.
/// Anything else is passed through, truncated.
pub fn summarize_source(source: &str) -> String {
    let Ok(s) = analyze_structure(source) else {
        return source.chars().take(MAX_RAW_SUMMARY_CHARS).collect();
    };

    let mut out = String::from("Steps:\n");
    for name in s.task_names.iter().take(MAX_SUMMARY_TASKS) {
        out.push_str("- ");
        out.push_str(name);
        out.push('\n');
    }
    if s.task_names.len() > MAX_SUMMARY_TASKS {
        out.push_str(&format!(
            "- ... and {} more\n",
            s.task_names.len() - MAX_SUMMARY_TASKS
        ));
    }
    out.push_str(&format!(
        "Structure: {} tasks, {} gateways, {} sub-processes, {} pools, {} lanes, events: {}",
        s.task_count,
        s.gateway_count(),
        s.subprocess_count,
        s.pool_count,
        s.lane_count,
        s.metrics().event_types.join(", "),
    ));
    out
}

/// Full prompt: variant instructions, tier constraints, then the source.
pub fn build_prompt(
    variant: &VariantDescriptor,
    source_summary: &str,
    diagram_type: DiagramType,
) -> String {
    format!(
        "Create the \"{title}\" alternative of the {kind} diagram below.\n\n\
         Instructions: {instructions}\n\n\
         Complexity ({tier}): {constraints}\n\n\
         Source diagram:\n{source_summary}",
        title = variant.title,
        kind = diagram_type.as_str().to_uppercase(),
        instructions = variant.instructions(diagram_type),
        tier = variant.complexity_tier,
        constraints = variant.complexity_tier.prompt_constraints(),
    )
}
