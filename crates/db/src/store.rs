//! [`GenerationStore`] backed by the `generation_cache` table.

use async_trait::async_trait;
use variantflow_core::candidate::GeneratedCandidate;
use variantflow_core::generation_cache::{
    CacheEntry, CacheKey, GenerationStore, RecordedFailure, StoreError,
};

use crate::models::generation_cache::{GenerationCacheRow, UpsertGenerationCache};
use crate::repositories::GenerationCacheRepo;
use crate::DbPool;

pub struct PgGenerationStore {
    pool: DbPool,
}

impl PgGenerationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn into_entry(row: GenerationCacheRow) -> Result<CacheEntry, StoreError> {
        let candidates: Vec<GeneratedCandidate> = serde_json::from_value(row.candidates)
            .map_err(|e| StoreError::Read(format!("Invalid candidates JSON: {e}")))?;
        let failures: Vec<RecordedFailure> = serde_json::from_value(row.failures)
            .map_err(|e| StoreError::Read(format!("Invalid failures JSON: {e}")))?;
        Ok(CacheEntry {
            key: CacheKey::new(row.owner_id, row.fingerprint_key),
            candidates,
            failures,
            source_payload: row.payload,
            requested: u32::try_from(row.requested).unwrap_or(0),
            complete: row.complete,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl GenerationStore for PgGenerationStore {
    async fn find(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let row = GenerationCacheRepo::find_latest(&self.pool, key.owner_id, &key.fingerprint)
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;
        row.map(Self::into_entry).transpose()
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let candidates = serde_json::to_value(&entry.candidates)
            .map_err(|e| StoreError::Write(format!("Failed to serialize candidates: {e}")))?;
        let failures = serde_json::to_value(&entry.failures)
            .map_err(|e| StoreError::Write(format!("Failed to serialize failures: {e}")))?;
        let requested = i32::try_from(entry.requested)
            .map_err(|_| StoreError::Write(format!("requested out of range: {}", entry.requested)))?;

        let input = UpsertGenerationCache {
            owner_id: entry.key.owner_id,
            fingerprint_key: &entry.key.fingerprint,
            candidates,
            failures,
            payload: entry.source_payload.as_deref(),
            requested,
            complete: entry.complete,
        };
        let row = GenerationCacheRepo::upsert(&self.pool, &input)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        tracing::debug!(
            owner_id = row.owner_id,
            fingerprint = %row.fingerprint_key,
            complete = row.complete,
            "Generation cache row written",
        );
        Ok(())
    }
}
