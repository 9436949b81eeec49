//! Optional remote renderer for heavy diagrams.
//!
//! The service receives `{payload, title}` and answers with raw image bytes.
//! Bytes are checked with the `image` crate before they are accepted, so a
//! misbehaving service falls through to the synthetic tier instead of
//! shipping a broken preview.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::RenderError;
use crate::outcome::{ImageFormat, PreviewImage};

#[async_trait]
pub trait RemoteRenderer: Send + Sync {
    async fn render(&self, payload: &str, title: &str) -> Result<PreviewImage, RenderError>;
}

#[derive(Serialize)]
struct RemoteRenderRequest<'a> {
    payload: &'a str,
    title: &'a str,
}

/// POSTs the diagram to a rendering endpoint.
pub struct HttpRemoteRenderer {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpRemoteRenderer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), url, timeout)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RemoteRenderer for HttpRemoteRenderer {
    async fn render(&self, payload: &str, title: &str) -> Result<PreviewImage, RenderError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&RemoteRenderRequest { payload, title })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RenderError::Timeout(self.timeout)
                } else {
                    RenderError::Remote(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Remote(format!(
                "renderer returned HTTP {}",
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::Remote(e.to_string()))?;
        decode_image(bytes.to_vec())
    }
}

/// Accept `bytes` only if they are a decodable raster image.
pub fn decode_image(bytes: Vec<u8>) -> Result<PreviewImage, RenderError> {
    if bytes.is_empty() {
        return Err(RenderError::Remote("empty response body".into()));
    }

    let reader = image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(|e| RenderError::Remote(e.to_string()))?;
    let format = match reader.format() {
        Some(image::ImageFormat::Png) => ImageFormat::Png,
        Some(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
        Some(image::ImageFormat::WebP) => ImageFormat::Webp,
        Some(other) => {
            return Err(RenderError::Remote(format!(
                "unsupported image format {other:?}"
            )))
        }
        None => return Err(RenderError::Remote("unrecognized image data".into())),
    };
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| RenderError::Remote(e.to_string()))?;
    if width == 0 || height == 0 {
        return Err(RenderError::Remote("image has no pixels".into()));
    }

    Ok(PreviewImage {
        bytes,
        format,
        width,
        height,
    })
}
