//! Support code for the `variantflow-worker` binary.

pub mod config;
pub mod export;

pub use config::WorkerConfig;
