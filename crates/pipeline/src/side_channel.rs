//! Best-effort access to the generation cache.
//!
//! Cache reads and writes never decide the outcome of a batch. Failures are
//! logged and swallowed here so the scheduler does not have to.

use std::sync::Arc;

use variantflow_core::generation_cache::{CacheEntry, CacheKey, GenerationStore};

#[derive(Clone)]
pub struct BestEffortCache {
    store: Arc<dyn GenerationStore>,
}

impl BestEffortCache {
    pub fn new(store: Arc<dyn GenerationStore>) -> Self {
        Self { store }
    }

    /// Cached entry for `key`; a read failure counts as a miss.
    pub async fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.store.find(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    owner_id = key.owner_id,
                    fingerprint = %key.fingerprint,
                    error = %e,
                    "Generation cache read failed, treating as miss",
                );
                None
            }
        }
    }

    /// Write `entry`. Returns whether the write landed.
    pub async fn write(&self, entry: &CacheEntry) -> bool {
        match self.store.upsert(entry).await {
            Ok(()) => {
                tracing::debug!(
                    owner_id = entry.key.owner_id,
                    candidates = entry.candidates.len(),
                    complete = entry.complete,
                    "Generation cache updated",
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    owner_id = entry.key.owner_id,
                    fingerprint = %entry.key.fingerprint,
                    error = %e,
                    "Generation cache write failed",
                );
                false
            }
        }
    }
}
