//! Wire types for the function invocation endpoint.

use serde::{Deserialize, Serialize};

/// Body of `POST /functions/v1/{function_id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub prompt: String,
    pub diagram_type: String,
    pub skip_cache: bool,
    pub agent_mode: bool,
}

/// Successful response. Only `payload` is read; other fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvokeResponse {
    #[serde(default, alias = "bpmnXml")]
    pub payload: Option<String>,
}

impl InvokeResponse {
    /// The payload if present and not blank.
    pub fn into_payload(self) -> Option<String> {
        self.payload.filter(|p| !p.trim().is_empty())
    }
}
