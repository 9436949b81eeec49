//! Rendered images and the outcome reported for each preview.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
            ImageFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Which stage of the cascade produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewTier {
    Primary,
    Secondary,
    Remote,
    Synthetic,
}

impl PreviewTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewTier::Primary => "primary",
            PreviewTier::Secondary => "secondary",
            PreviewTier::Remote => "remote",
            PreviewTier::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for PreviewTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one preview request. Always carries an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOutcome {
    pub image: PreviewImage,
    pub tier: PreviewTier,
    /// Set only when the synthetic fallback produced the image.
    pub degraded: bool,
}

impl PreviewOutcome {
    pub fn new(image: PreviewImage, tier: PreviewTier) -> Self {
        Self {
            image,
            tier,
            degraded: tier == PreviewTier::Synthetic,
        }
    }
}
