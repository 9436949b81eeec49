use std::time::Duration;

use crate::raster::RasterError;

/// Failure of a single render tier. The pipeline moves on to the next tier.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Render timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Render engine failed: {0}")]
    Engine(String),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("Remote render failed: {0}")]
    Remote(String),
}
