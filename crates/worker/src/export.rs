//! Writes candidates and their previews to disk.
//!
//! Each candidate produces `{id}.bpmn` plus one preview file. Raster
//! previews are stored as PNG; JPEG and WebP images from the remote tier are
//! re-encoded. Synthetic previews that could not be rasterized stay SVG.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use variantflow_core::candidate::GeneratedCandidate;
use variantflow_events::{CandidateIntent, ExportFormat};
use variantflow_preview::{ImageFormat, PreviewOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to re-encode preview for {candidate_id}: {source}")]
    Transcode {
        candidate_id: String,
        #[source]
        source: image::ImageError,
    },
}

/// A file written for a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub candidate_id: String,
    pub format: ExportFormat,
    pub path: PathBuf,
}

impl ExportedFile {
    /// Download intent pointing at this file.
    pub fn intent(&self) -> CandidateIntent {
        CandidateIntent::Download {
            candidate_id: self.candidate_id.clone(),
            format: self.format,
            path: Some(self.path.clone()),
        }
    }
}

/// Write `candidate`'s payload and preview into `dir`.
pub async fn write_candidate(
    dir: &Path,
    candidate: &GeneratedCandidate,
    preview: &PreviewOutcome,
) -> Result<Vec<ExportedFile>, ExportError> {
    let mut written = Vec::with_capacity(2);

    let diagram = write_file(
        dir,
        candidate,
        ExportFormat::Bpmn,
        candidate.payload.as_bytes(),
    )
    .await?;
    written.push(diagram);

    let (format, bytes) = preview_bytes(candidate, preview)?;
    written.push(write_file(dir, candidate, format, &bytes).await?);

    Ok(written)
}

fn preview_bytes(
    candidate: &GeneratedCandidate,
    preview: &PreviewOutcome,
) -> Result<(ExportFormat, Vec<u8>), ExportError> {
    let image = &preview.image;
    match image.format {
        ImageFormat::Png => Ok((ExportFormat::Png, image.bytes.clone())),
        ImageFormat::Svg => Ok((ExportFormat::Svg, image.bytes.clone())),
        ImageFormat::Jpeg | ImageFormat::Webp => {
            let transcode = |source| ExportError::Transcode {
                candidate_id: candidate.id.clone(),
                source,
            };
            let decoded = image::load_from_memory(&image.bytes).map_err(transcode)?;
            let mut png = Vec::new();
            decoded
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(transcode)?;
            Ok((ExportFormat::Png, png))
        }
    }
}

async fn write_file(
    dir: &Path,
    candidate: &GeneratedCandidate,
    format: ExportFormat,
    bytes: &[u8],
) -> Result<ExportedFile, ExportError> {
    let path = dir.join(format!("{}.{}", candidate.id, format.extension()));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
    tracing::debug!(candidate_id = %candidate.id, path = %path.display(), "Wrote candidate file");

    Ok(ExportedFile {
        candidate_id: candidate.id.clone(),
        format,
        path,
    })
}
