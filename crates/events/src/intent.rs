//! Requests handed from the candidate list to the diagram editing surface.
//!
//! The editing surface is external; it subscribes to the bus and acts on
//! [`CandidateIntent`]s published inside `EventKind::Intent`.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Bpmn,
    Png,
    Svg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Bpmn => "bpmn",
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CandidateIntent {
    /// Replace the editor's diagram with the candidate payload.
    Apply {
        candidate_id: String,
        payload: String,
    },
    /// Export the candidate. `path` is set when the file was already written.
    Download {
        candidate_id: String,
        format: ExportFormat,
        path: Option<PathBuf>,
    },
}

impl CandidateIntent {
    pub fn candidate_id(&self) -> &str {
        match self {
            CandidateIntent::Apply { candidate_id, .. }
            | CandidateIntent::Download { candidate_id, .. } => candidate_id,
        }
    }
}
