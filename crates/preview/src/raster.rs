//! SVG to PNG rasterization on `usvg` + `resvg` + `tiny-skia`.
//!
//! Output always has exactly the requested pixel size. The drawing is
//! scaled to fit and centred on an opaque background.

use std::sync::{Arc, LazyLock};

use crate::outcome::{ImageFormat, PreviewImage, RenderSize};

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("SVG has no drawable area")]
    EmptyViewport,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
}

/// System fonts, loaded once and shared by every render.
static FONTS: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "Loaded system fonts for preview rendering");
    Arc::new(db)
});

#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub size: RenderSize,
    /// Fill behind the drawing. White unless a caller overrides it.
    pub background: tiny_skia::Color,
}

impl RasterOptions {
    pub fn new(size: RenderSize) -> Self {
        Self {
            size,
            background: tiny_skia::Color::WHITE,
        }
    }
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<PreviewImage, RasterError> {
    let pixmap = svg_to_pixmap(svg, options)?;
    let bytes = pixmap.encode_png().map_err(|_| RasterError::PngEncode)?;
    Ok(PreviewImage {
        bytes,
        format: ImageFormat::Png,
        width: pixmap.width(),
        height: pixmap.height(),
    })
}

fn svg_to_pixmap(svg: &str, options: &RasterOptions) -> Result<tiny_skia::Pixmap, RasterError> {
    let mut opt = usvg::Options::default();
    opt.fontdb = Arc::clone(&FONTS);
    opt.font_family = "Arial".to_string();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)?;

    let src = tree.size();
    let (src_w, src_h) = (src.width(), src.height());
    if !(src_w.is_finite() && src_h.is_finite() && src_w > 0.0 && src_h > 0.0) {
        return Err(RasterError::EmptyViewport);
    }

    let width_px = options.size.width.max(1);
    let height_px = options.size.height.max(1);
    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px).ok_or(RasterError::PixmapAlloc)?;

    pixmap.fill(options.background);

    let scale = (width_px as f32 / src_w).min(height_px as f32 / src_h);
    let dx = (width_px as f32 - src_w * scale) / 2.0;
    let dy = (height_px as f32 - src_h * scale) / 2.0;
    let transform = tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, dx, dy);

    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Ok(pixmap)
}
