//! SVG emission for a [`DiagramLayout`].

use std::fmt::Write as _;

use crate::layout::{DiagramLayout, LayoutNode, NodeKind};

const PADDING: f64 = 20.0;
const TITLE_HEIGHT: f64 = 32.0;
const MAX_LABEL_CHARS: usize = 18;
const STROKE: &str = "#22242a";

/// Escape text for use in SVG character data and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && c != '\n' && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let mut short: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
    short.push('…');
    short
}

/// Render `layout` as a standalone SVG document.
///
/// `title`, when given, is drawn in a band above the diagram. An empty
/// layout yields a document with only the title band.
pub fn render_svg(layout: &DiagramLayout, title: Option<&str>) -> String {
    let (min_x, min_y, max_x, max_y) = layout.bounds().unwrap_or((0.0, 0.0, 200.0, 60.0));
    let title_band = if title.is_some() { TITLE_HEIGHT } else { 0.0 };

    let vb_x = min_x - PADDING;
    let vb_y = min_y - PADDING - title_band;
    let vb_w = (max_x - min_x) + PADDING * 2.0;
    let vb_h = (max_y - min_y) + PADDING * 2.0 + title_band;

    let mut svg = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{vb_x} {vb_y} {vb_w} {vb_h}" width="{vb_w}" height="{vb_h}">"#
    );
    svg.push_str(&format!(
        r#"<defs><marker id="arrow" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8" orient="auto"><path d="M0,0 L10,5 L0,10 z" fill="{STROKE}"/></marker></defs>"#
    ));
    let _ = write!(
        svg,
        r#"<rect x="{vb_x}" y="{vb_y}" width="{vb_w}" height="{vb_h}" fill="white"/>"#
    );

    if let Some(title) = title {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-size="16" font-weight="bold" fill="{STROKE}">{}</text>"#,
            vb_x + PADDING,
            vb_y + PADDING + 4.0,
            escape_xml(title)
        );
    }

    for edge in &layout.edges {
        let points: Vec<String> = edge
            .points
            .iter()
            .map(|(x, y)| format!("{x:.1},{y:.1}"))
            .collect();
        let _ = write!(
            svg,
            r#"<polyline points="{}" fill="none" stroke="{STROKE}" stroke-width="1.5" marker-end="url(#arrow)"/>"#,
            points.join(" ")
        );
    }

    for node in &layout.nodes {
        write_node(&mut svg, node);
    }

    svg.push_str("</svg>");
    svg
}

fn write_node(svg: &mut String, n: &LayoutNode) {
    let (cx, cy) = n.center();
    let _ = match n.kind {
        NodeKind::Task | NodeKind::SubProcess => {
            let dash = if n.kind == NodeKind::SubProcess {
                r#" stroke-dasharray="4 2""#
            } else {
                ""
            };
            write!(
                svg,
                r##"<rect x="{}" y="{}" width="{}" height="{}" rx="10" fill="#f4f7fb" stroke="{STROKE}" stroke-width="1.5"{dash}/>"##,
                n.x, n.y, n.width, n.height
            )
        }
        NodeKind::Gateway => write!(
            svg,
            r##"<polygon points="{cx},{} {},{cy} {cx},{} {},{cy}" fill="#fff8e1" stroke="{STROKE}" stroke-width="1.5"/>"##,
            n.y,
            n.x + n.width,
            n.y + n.height,
            n.x
        ),
        NodeKind::StartEvent | NodeKind::EndEvent | NodeKind::IntermediateEvent => {
            let r = n.width.min(n.height) / 2.0;
            let width = if n.kind == NodeKind::EndEvent { 3.5 } else { 1.5 };
            let inner = if n.kind == NodeKind::IntermediateEvent {
                format!(
                    r#"<circle cx="{cx}" cy="{cy}" r="{}" fill="none" stroke="{STROKE}" stroke-width="1"/>"#,
                    (r - 3.0).max(1.0)
                )
            } else {
                String::new()
            };
            write!(
                svg,
                r#"<circle cx="{cx}" cy="{cy}" r="{r}" fill="white" stroke="{STROKE}" stroke-width="{width}"/>{inner}"#
            )
        }
    };

    if !n.label.is_empty() {
        let label_y = match n.kind {
            NodeKind::Task | NodeKind::SubProcess => cy + 4.0,
            _ => n.y + n.height + 14.0,
        };
        let _ = write!(
            svg,
            r#"<text x="{cx}" y="{label_y}" font-size="11" text-anchor="middle" fill="{STROKE}">{}</text>"#,
            escape_xml(&truncate_label(&n.label))
        );
    }
}
