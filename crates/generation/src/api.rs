//! REST wrapper for the generation service's function endpoint.
//!
//! Only transport concerns live here: URL construction, auth header, status
//! checks and JSON decoding. Failure classification happens in
//! [`crate::client`].

use std::time::Duration;

use crate::messages::{InvokeRequest, InvokeResponse};

/// HTTP client for one generation service deployment.
pub struct GenerationApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum GenerationApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Generation API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// A 2xx response whose body is not the expected JSON.
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl GenerationApi {
    /// * `base_url` - Service root, e.g. `https://project.example.co`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub fn function_url(&self, function_id: &str) -> String {
        format!("{}/functions/v1/{function_id}", self.base_url)
    }

    /// Invoke `function_id` with `request`.
    ///
    /// `timeout` is applied to the HTTP request as well, so the connection is
    /// released if the caller's own deadline is not enforced.
    pub async fn invoke(
        &self,
        function_id: &str,
        request: &InvokeRequest,
        timeout: Duration,
    ) -> Result<InvokeResponse, GenerationApiError> {
        let mut builder = self
            .client
            .post(self.function_url(function_id))
            .timeout(timeout)
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`GenerationApiError::ApiError`] carrying status and body.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GenerationApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GenerationApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Decode a successful JSON body. Reading the body is a transport
    /// concern; a body that is not JSON is a decode error.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GenerationApiError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| GenerationApiError::Decode(e.to_string()))
    }
}
