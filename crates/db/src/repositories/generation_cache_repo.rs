//! Repository for the `generation_cache` table.

use sqlx::PgPool;
use variantflow_core::types::OwnerId;

use crate::models::generation_cache::{GenerationCacheRow, UpsertGenerationCache};

/// Column list for generation_cache queries.
const COLUMNS: &str = "id, owner_id, fingerprint_key, candidates, failures, payload, \
                       requested, complete, created_at, updated_at";

/// Provides data access for cached generation batches.
pub struct GenerationCacheRepo;

impl GenerationCacheRepo {
    /// Insert or replace the row for `(owner_id, fingerprint_key)`.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertGenerationCache<'_>,
    ) -> Result<GenerationCacheRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_cache
                (owner_id, fingerprint_key, candidates, failures, payload, requested, complete)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (owner_id, fingerprint_key) DO UPDATE SET
                candidates = EXCLUDED.candidates,
                failures = EXCLUDED.failures,
                payload = COALESCE(EXCLUDED.payload, generation_cache.payload),
                requested = EXCLUDED.requested,
                complete = EXCLUDED.complete,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationCacheRow>(&query)
            .bind(input.owner_id)
            .bind(input.fingerprint_key)
            .bind(&input.candidates)
            .bind(&input.failures)
            .bind(input.payload)
            .bind(input.requested)
            .bind(input.complete)
            .fetch_one(pool)
            .await
    }

    /// Most recently updated row for an owner and fingerprint.
    pub async fn find_latest(
        pool: &PgPool,
        owner_id: OwnerId,
        fingerprint_key: &str,
    ) -> Result<Option<GenerationCacheRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_cache
             WHERE owner_id = $1 AND fingerprint_key = $2
             ORDER BY updated_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, GenerationCacheRow>(&query)
            .bind(owner_id)
            .bind(fingerprint_key)
            .fetch_optional(pool)
            .await
    }
}
