use variantflow_core::candidate::GenerationJob;

/// Terminal failure of a whole batch. Partial success is not an error.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Every job failed. Carries the settled jobs for inspection.
    #[error("All {} generation jobs failed", .jobs.len())]
    AllFailed { jobs: Vec<GenerationJob> },

    /// The batch was cancelled before any candidate completed.
    #[error("Batch cancelled before any candidate completed")]
    Cancelled { jobs: Vec<GenerationJob> },

    #[error("Invalid batch request: {0}")]
    InvalidRequest(String),
}

impl BatchError {
    /// Jobs as they stood when the batch ended, if it started at all.
    pub fn jobs(&self) -> &[GenerationJob] {
        match self {
            BatchError::AllFailed { jobs } | BatchError::Cancelled { jobs } => jobs,
            BatchError::InvalidRequest(_) => &[],
        }
    }
}
