//! Client for the external diagram generation service.
//!
//! - [`api`]: thin reqwest wrapper over the function invocation endpoint.
//! - [`client`]: the [`GenerationClient`] seam and its HTTP implementation,
//!   which applies tier budgets and classifies failures.
//! - [`prompt`]: prompt and source-summary construction.
//! - [`timeouts`]: the per-tier timeout schedule.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod messages;
pub mod prompt;
pub mod timeouts;

pub use client::{GenerationClient, HttpGenerationClient};
pub use config::GenerationConfig;
pub use error::GenerationError;
pub use timeouts::TimeoutSchedule;
