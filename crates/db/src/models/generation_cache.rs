//! Generation cache row model.

use serde::Serialize;
use sqlx::FromRow;
use variantflow_core::types::{OwnerId, Timestamp};

/// A row from the `generation_cache` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GenerationCacheRow {
    pub id: i64,
    pub owner_id: OwnerId,
    pub fingerprint_key: String,
    /// Serialized `Vec<GeneratedCandidate>`.
    pub candidates: serde_json::Value,
    /// Serialized `Vec<RecordedFailure>`.
    pub failures: serde_json::Value,
    pub payload: Option<String>,
    pub requested: i32,
    pub complete: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for upserting a cache row.
#[derive(Debug)]
pub struct UpsertGenerationCache<'a> {
    pub owner_id: OwnerId,
    pub fingerprint_key: &'a str,
    pub candidates: serde_json::Value,
    pub failures: serde_json::Value,
    pub payload: Option<&'a str>,
    pub requested: i32,
    pub complete: bool,
}
