//! Batch orchestration: turn one source diagram into several generated
//! alternatives.
//!
//! [`CandidateScheduler::run_batch`] selects variants from the catalog,
//! consults the generation cache, fans out one generation call per variant
//! and folds the results as they settle. Progress, job transitions and
//! user-facing notifications are published on the event bus.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod scheduler;
pub mod side_channel;

pub use config::PipelineConfig;
pub use error::BatchError;
pub use fingerprint::{batch_fingerprint, normalize_source};
pub use scheduler::{BatchOutcome, BatchRequest, CandidateFindings, CandidateScheduler, VariantSelection};
pub use side_channel::BestEffortCache;
