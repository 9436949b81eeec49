//! Domain types and pure logic for multi-variant diagram generation.
//!
//! No network or database access happens here; those live in the
//! generation, preview and db crates.

pub mod candidate;
pub mod catalog;
pub mod config;
pub mod error;
pub mod generation_cache;
pub mod hashing;
pub mod metrics;
pub mod scoring;
pub mod tier;
pub mod types;
pub mod validation;
