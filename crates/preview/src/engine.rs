//! Local render engine: layout, SVG, then raster.

use tokio_util::sync::CancellationToken;

use crate::error::RenderError;
use crate::layout::layout_diagram;
use crate::outcome::{PreviewImage, RenderSize};
use crate::raster::{svg_to_png, RasterOptions};
use crate::svg::render_svg;

/// Diagrams with more drawable nodes than this are left to the remote or
/// synthetic tiers.
pub const MAX_ENGINE_NODES: usize = 1500;

/// A synchronous renderer. The pipeline runs it on the blocking pool and
/// races it against the tier budget.
///
/// `cancel` fires once the pipeline has given up on the call. Blocking work
/// cannot be aborted from outside, so implementations should check it
/// between stages and bail out early.
pub trait PreviewRenderer: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    fn render(
        &self,
        payload: &str,
        title: &str,
        size: RenderSize,
        cancel: &CancellationToken,
    ) -> Result<PreviewImage, RenderError>;
}

fn ensure_wanted(cancel: &CancellationToken) -> Result<(), RenderError> {
    if cancel.is_cancelled() {
        return Err(RenderError::Engine("render abandoned by the pipeline".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct EngineRenderer;

impl EngineRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Lay out and draw `payload` as SVG without rasterizing.
    pub fn render_svg(&self, payload: &str) -> Result<String, RenderError> {
        self.draw(payload, &CancellationToken::new())
    }

    fn draw(&self, payload: &str, cancel: &CancellationToken) -> Result<String, RenderError> {
        let layout = layout_diagram(payload)?;
        ensure_wanted(cancel)?;
        if layout.nodes.len() > MAX_ENGINE_NODES {
            return Err(RenderError::Engine(format!(
                "{} nodes exceeds the local engine limit of {MAX_ENGINE_NODES}",
                layout.nodes.len()
            )));
        }
        Ok(render_svg(&layout, None))
    }
}

impl PreviewRenderer for EngineRenderer {
    fn name(&self) -> &'static str {
        "engine"
    }

    fn render(
        &self,
        payload: &str,
        _title: &str,
        size: RenderSize,
        cancel: &CancellationToken,
    ) -> Result<PreviewImage, RenderError> {
        let svg = self.draw(payload, cancel)?;
        ensure_wanted(cancel)?;
        Ok(svg_to_png(&svg, &RasterOptions::new(size))?)
    }
}
