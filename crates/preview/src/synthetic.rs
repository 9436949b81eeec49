//! Last-resort schematic preview.
//!
//! Draws a fixed chain of boxes from the diagram's first task names with
//! start, intermediate and end markers. Works offline and never fails: when
//! rasterization is impossible the SVG document itself is returned.

use variantflow_core::metrics::analyze_structure;

use crate::layout::{DiagramLayout, LayoutEdge, LayoutNode, NodeKind};
use crate::outcome::{ImageFormat, PreviewImage, RenderSize};
use crate::raster::{svg_to_png, RasterOptions};
use crate::svg::render_svg;

/// Most task boxes drawn.
pub const MAX_SYNTHETIC_TASKS: usize = 8;

const PER_ROW: usize = 4;
const BOX_W: f64 = 120.0;
const BOX_H: f64 = 60.0;
const GAP_X: f64 = 50.0;
const GAP_Y: f64 = 50.0;
const EVENT: f64 = 36.0;

/// What the schematic shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntheticSketch {
    pub task_names: Vec<String>,
    pub hidden_tasks: usize,
    pub has_start: bool,
    pub has_intermediate: bool,
    pub has_end: bool,
}

impl SyntheticSketch {
    /// `None` when the payload does not parse.
    pub fn from_payload(payload: &str) -> Option<Self> {
        let s = analyze_structure(payload).ok()?;
        let task_names: Vec<String> = s
            .task_names
            .iter()
            .take(MAX_SYNTHETIC_TASKS)
            .cloned()
            .collect();
        Some(Self {
            hidden_tasks: s.task_names.len().saturating_sub(task_names.len()),
            task_names,
            has_start: s.start_event_count > 0,
            has_intermediate: s.intermediate_event_count > 0,
            has_end: s.end_event_count > 0,
        })
    }

    fn layout(&self) -> DiagramLayout {
        let mut labels: Vec<(String, NodeKind)> = Vec::new();
        if self.has_start {
            labels.push((String::new(), NodeKind::StartEvent));
        }
        for (i, name) in self.task_names.iter().enumerate() {
            labels.push((name.clone(), NodeKind::Task));
            if i == 0 && self.has_intermediate {
                labels.push((String::new(), NodeKind::IntermediateEvent));
            }
        }
        if self.task_names.is_empty() && self.has_intermediate {
            labels.push((String::new(), NodeKind::IntermediateEvent));
        }
        if self.hidden_tasks > 0 {
            labels.push((format!("+{} more", self.hidden_tasks), NodeKind::SubProcess));
        }
        if self.has_end {
            labels.push((String::new(), NodeKind::EndEvent));
        }

        let nodes: Vec<LayoutNode> = labels
            .into_iter()
            .enumerate()
            .map(|(i, (label, kind))| {
                let (row, col) = (i / PER_ROW, i % PER_ROW);
                let slot_x = col as f64 * (BOX_W + GAP_X);
                let slot_y = row as f64 * (BOX_H + GAP_Y);
                let (w, h) = match kind {
                    NodeKind::Task | NodeKind::SubProcess => (BOX_W, BOX_H),
                    _ => (EVENT, EVENT),
                };
                LayoutNode {
                    id: format!("n{i}"),
                    label,
                    kind,
                    x: slot_x + (BOX_W - w) / 2.0,
                    y: slot_y + (BOX_H - h) / 2.0,
                    width: w,
                    height: h,
                }
            })
            .collect();

        let edges = nodes
            .windows(2)
            .map(|pair| {
                let (a, b) = (&pair[0], &pair[1]);
                let points = if (b.center().1 - a.center().1).abs() < f64::EPSILON {
                    vec![(a.x + a.width, a.center().1), (b.x, b.center().1)]
                } else {
                    // Wrap to the next row.
                    let mid_y = a.y + a.height + GAP_Y / 2.0;
                    vec![
                        (a.center().0, a.y + a.height),
                        (a.center().0, mid_y),
                        (b.center().0, mid_y),
                        (b.center().0, b.y),
                    ]
                };
                LayoutEdge { points }
            })
            .collect();

        DiagramLayout { nodes, edges }
    }
}

/// Schematic SVG for `payload`, or a title-only placeholder when the
/// payload does not parse.
pub fn synthetic_svg(payload: &str, title: &str) -> String {
    let layout = SyntheticSketch::from_payload(payload)
        .map(|sketch| sketch.layout())
        .unwrap_or_default();
    render_svg(&layout, Some(title))
}

/// Render the synthetic preview. Infallible.
pub fn synthetic_preview(payload: &str, title: &str, size: RenderSize) -> PreviewImage {
    let svg = synthetic_svg(payload, title);
    match svg_to_png(&svg, &RasterOptions::new(size)) {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!(error = %e, "Synthetic rasterization failed, returning SVG");
            PreviewImage {
                bytes: svg.into_bytes(),
                format: ImageFormat::Svg,
                width: size.width,
                height: size.height,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sketch_caps_tasks_and_counts_hidden() {
        let tasks: String = (0..11)
            .map(|i| format!(r#"<task id="t{i}" name="Step {i}"/>"#))
            .collect();
        let payload = format!(
            r#"<definitions><process><startEvent id="s"/>{tasks}<endEvent id="e"/></process></definitions>"#
        );
        let sketch = SyntheticSketch::from_payload(&payload).unwrap();
        assert_eq!(sketch.task_names.len(), MAX_SYNTHETIC_TASKS);
        assert_eq!(sketch.hidden_tasks, 3);
        assert!(sketch.has_start && sketch.has_end && !sketch.has_intermediate);
    }

    #[test]
    fn unparseable_payload_gives_title_only_placeholder() {
        let svg = synthetic_svg("<<<not xml", "Resilient Compensation");
        assert!(svg.contains("Resilient Compensation"));
        assert!(!svg.contains("<circle"));
        assert!(!svg.contains(r#"rx="10""#));
    }

    #[test]
    fn empty_process_still_renders_labeled_image() {
        let img = synthetic_preview(
            "<definitions><process/></definitions>",
            "Happy Path",
            RenderSize::new(320, 240),
        );
        assert!(!img.bytes.is_empty());
        assert_eq!((img.width, img.height), (320, 240));
    }

    #[test]
    fn synthetic_svg_is_well_formed() {
        let payload = r#"<definitions><process>
            <startEvent id="s"/><task id="a" name="A"/>
            <intermediateCatchEvent id="i"/><task id="b" name="B"/><endEvent id="e"/>
        </process></definitions>"#;
        let svg = synthetic_svg(payload, "T");
        assert!(roxmltree::Document::parse(&svg).is_ok());
        assert_eq!(svg.matches("<polyline").count(), 4);
    }
}
