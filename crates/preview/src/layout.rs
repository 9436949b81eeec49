//! Node and edge geometry for BPMN payloads.
//!
//! Diagrams that carry BPMN DI (`BPMNShape`/`BPMNEdge`) are drawn where the
//! DI puts them. Diagrams without DI get a layered left-to-right layout
//! derived from their sequence flows.

use std::collections::{HashMap, VecDeque};

use crate::error::RenderError;

const MARGIN: f64 = 20.0;
const TASK_SIZE: (f64, f64) = (100.0, 80.0);
const GATEWAY_SIZE: (f64, f64) = (50.0, 50.0);
const EVENT_SIZE: (f64, f64) = (36.0, 36.0);
const LAYER_GAP: f64 = 60.0;
const ROW_GAP: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Task,
    SubProcess,
    Gateway,
    StartEvent,
    EndEvent,
    IntermediateEvent,
}

impl NodeKind {
    fn from_local_name(name: &str) -> Option<Self> {
        let kind = match name {
            "task" | "userTask" | "serviceTask" | "scriptTask" | "manualTask"
            | "businessRuleTask" | "sendTask" | "receiveTask" | "callActivity" => NodeKind::Task,
            "subProcess" | "transaction" | "adHocSubProcess" => NodeKind::SubProcess,
            "exclusiveGateway" | "inclusiveGateway" | "parallelGateway" | "eventBasedGateway"
            | "complexGateway" => NodeKind::Gateway,
            "startEvent" => NodeKind::StartEvent,
            "endEvent" => NodeKind::EndEvent,
            "intermediateCatchEvent" | "intermediateThrowEvent" | "boundaryEvent" => {
                NodeKind::IntermediateEvent
            }
            _ => return None,
        };
        Some(kind)
    }

    fn default_size(&self) -> (f64, f64) {
        match self {
            NodeKind::Task | NodeKind::SubProcess => TASK_SIZE,
            NodeKind::Gateway => GATEWAY_SIZE,
            NodeKind::StartEvent | NodeKind::EndEvent | NodeKind::IntermediateEvent => EVENT_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutNode {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

/// Axis-aligned bounds `(min_x, min_y, max_x, max_y)`.
pub type Bounds = (f64, f64, f64, f64);

impl DiagramLayout {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let node_points = self
            .nodes
            .iter()
            .flat_map(|n| [(n.x, n.y), (n.x + n.width, n.y + n.height)]);
        let edge_points = self.edges.iter().flat_map(|e| e.points.iter().copied());

        node_points
            .chain(edge_points)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .fold(None, |acc, (x, y)| match acc {
                None => Some((x, y, x, y)),
                Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
            })
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

struct Flow<'a> {
    id: Option<&'a str>,
    source: &'a str,
    target: &'a str,
}

fn attr_f64(node: roxmltree::Node<'_, '_>, name: &str) -> Option<f64> {
    node.attribute(name)?.trim().parse().ok()
}

/// Lay out `payload`. Fails when it does not parse or has no flow nodes.
pub fn layout_diagram(payload: &str) -> Result<DiagramLayout, RenderError> {
    let doc = roxmltree::Document::parse(payload)
        .map_err(|e| RenderError::Engine(format!("invalid diagram XML: {e}")))?;

    let mut nodes: Vec<(String, String, NodeKind)> = Vec::new();
    let mut flows: Vec<Flow<'_>> = Vec::new();
    let mut shapes: HashMap<&str, (f64, f64, f64, f64)> = HashMap::new();
    let mut di_edges: HashMap<&str, Vec<(f64, f64)>> = HashMap::new();

    for node in doc.descendants().filter(|n| n.is_element()) {
        let name = node.tag_name().name();
        if let Some(kind) = NodeKind::from_local_name(name) {
            if let Some(id) = node.attribute("id") {
                let label = node.attribute("name").unwrap_or_default().trim().to_string();
                nodes.push((id.to_string(), label, kind));
            }
            continue;
        }
        match name {
            "sequenceFlow" => {
                if let (Some(source), Some(target)) =
                    (node.attribute("sourceRef"), node.attribute("targetRef"))
                {
                    flows.push(Flow {
                        id: node.attribute("id"),
                        source,
                        target,
                    });
                }
            }
            "BPMNShape" => {
                let bounds = node
                    .children()
                    .find(|c| c.is_element() && c.tag_name().name() == "Bounds");
                if let (Some(element), Some(b)) = (node.attribute("bpmnElement"), bounds) {
                    if let (Some(x), Some(y), Some(w), Some(h)) = (
                        attr_f64(b, "x"),
                        attr_f64(b, "y"),
                        attr_f64(b, "width"),
                        attr_f64(b, "height"),
                    ) {
                        shapes.insert(element, (x, y, w, h));
                    }
                }
            }
            "BPMNEdge" => {
                if let Some(element) = node.attribute("bpmnElement") {
                    let points: Vec<_> = node
                        .children()
                        .filter(|c| c.is_element() && c.tag_name().name() == "waypoint")
                        .filter_map(|w| Some((attr_f64(w, "x")?, attr_f64(w, "y")?)))
                        .collect();
                    di_edges.insert(element, points);
                }
            }
            _ => {}
        }
    }

    if nodes.is_empty() {
        return Err(RenderError::Engine(
            "diagram has no drawable elements".to_string(),
        ));
    }

    let has_di = nodes.iter().any(|(id, _, _)| shapes.contains_key(id.as_str()));
    let layout = if has_di {
        di_layout(nodes, &flows, &shapes, &di_edges)
    } else {
        auto_layout(nodes, &flows)
    };
    Ok(layout)
}

// ---------------------------------------------------------------------------
// DI layout
// ---------------------------------------------------------------------------

fn di_layout(
    nodes: Vec<(String, String, NodeKind)>,
    flows: &[Flow<'_>],
    shapes: &HashMap<&str, (f64, f64, f64, f64)>,
    di_edges: &HashMap<&str, Vec<(f64, f64)>>,
) -> DiagramLayout {
    let placed: Vec<LayoutNode> = nodes
        .into_iter()
        .filter_map(|(id, label, kind)| {
            let &(x, y, width, height) = shapes.get(id.as_str())?;
            Some(LayoutNode {
                id,
                label,
                kind,
                x,
                y,
                width,
                height,
            })
        })
        .collect();

    let by_id: HashMap<&str, &LayoutNode> = placed.iter().map(|n| (n.id.as_str(), n)).collect();
    let edges = flows
        .iter()
        .filter_map(|f| {
            if let Some(points) = f.id.and_then(|id| di_edges.get(id)) {
                if points.len() >= 2 {
                    return Some(LayoutEdge {
                        points: points.clone(),
                    });
                }
            }
            let (s, t) = (by_id.get(f.source)?, by_id.get(f.target)?);
            Some(LayoutEdge {
                points: vec![s.center(), t.center()],
            })
        })
        .collect();

    DiagramLayout {
        nodes: placed,
        edges,
    }
}

// ---------------------------------------------------------------------------
// Auto layout
// ---------------------------------------------------------------------------

/// Longest-path layering over sequence flows. Nodes on cycles are placed one
/// layer after their furthest already-placed predecessor, in document order.
fn assign_layers(count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut indegree = vec![0usize; count];
    let mut succ: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut pred: Vec<Vec<usize>> = vec![Vec::new(); count];
    for &(s, t) in edges {
        if s == t {
            continue;
        }
        indegree[t] += 1;
        succ[s].push(t);
        pred[t].push(s);
    }

    let mut layer = vec![0usize; count];
    let mut placed = vec![false; count];
    let mut queue: VecDeque<usize> = (0..count).filter(|&i| indegree[i] == 0).collect();

    while let Some(n) = queue.pop_front() {
        placed[n] = true;
        for &t in &succ[n] {
            layer[t] = layer[t].max(layer[n] + 1);
            indegree[t] -= 1;
            if indegree[t] == 0 {
                queue.push_back(t);
            }
        }
    }

    for n in 0..count {
        if placed[n] {
            continue;
        }
        layer[n] = pred[n]
            .iter()
            .filter(|&&p| placed[p])
            .map(|&p| layer[p] + 1)
            .max()
            .unwrap_or(0);
        placed[n] = true;
    }
    layer
}

fn auto_layout(nodes: Vec<(String, String, NodeKind)>, flows: &[Flow<'_>]) -> DiagramLayout {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, (id, _, _))| (id.as_str(), i))
        .collect();
    let edges: Vec<(usize, usize)> = flows
        .iter()
        .filter_map(|f| Some((*index.get(f.source)?, *index.get(f.target)?)))
        .collect();

    let layers = assign_layers(nodes.len(), &edges);
    let mut rows_used: HashMap<usize, usize> = HashMap::new();
    let column_width = TASK_SIZE.0 + LAYER_GAP;
    let row_height = TASK_SIZE.1 + ROW_GAP;

    let placed: Vec<LayoutNode> = nodes
        .into_iter()
        .zip(&layers)
        .map(|((id, label, kind), &layer)| {
            let row = rows_used.entry(layer).or_default();
            let (width, height) = kind.default_size();
            let slot_x = MARGIN + layer as f64 * column_width;
            let slot_y = MARGIN + *row as f64 * row_height;
            *row += 1;
            LayoutNode {
                id,
                label,
                kind,
                x: slot_x + (TASK_SIZE.0 - width) / 2.0,
                y: slot_y + (TASK_SIZE.1 - height) / 2.0,
                width,
                height,
            }
        })
        .collect();

    let edges = edges
        .into_iter()
        .map(|(s, t)| {
            let (a, b) = (&placed[s], &placed[t]);
            LayoutEdge {
                points: vec![
                    (a.x + a.width, a.y + a.height / 2.0),
                    (b.x, b.y + b.height / 2.0),
                ],
            }
        })
        .collect();

    DiagramLayout {
        nodes: placed,
        edges,
    }
}
