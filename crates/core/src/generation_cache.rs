//! Content-addressed store for generated candidate batches.
//!
//! Entries are keyed by owner and batch fingerprint. Writers always send
//! the full list accumulated so far, so the last write wins.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::candidate::{GeneratedCandidate, GenerationFailureKind};
use crate::types::{OwnerId, Timestamp};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub owner_id: OwnerId,
    pub fingerprint: String,
}

impl CacheKey {
    pub fn new(owner_id: OwnerId, fingerprint: impl Into<String>) -> Self {
        Self {
            owner_id,
            fingerprint: fingerprint.into(),
        }
    }
}

/// A variant of a cached batch that produced no candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedFailure {
    pub variant_id: String,
    pub kind: GenerationFailureKind,
}

/// A cached batch. `complete` is only set by the terminal write of a batch;
/// incremental writes leave it `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub candidates: Vec<GeneratedCandidate>,
    /// Variants that failed so far, in catalog order.
    #[serde(default)]
    pub failures: Vec<RecordedFailure>,
    /// Source diagram the batch was generated from, kept for inspection.
    #[serde(default)]
    pub source_payload: Option<String>,
    /// Number of variants the batch requested.
    pub requested: u32,
    pub complete: bool,
    pub updated_at: Timestamp,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache_read_error: {0}")]
    Read(String),

    #[error("cache_write_error: {0}")]
    Write(String),
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn find(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError>;

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store used in tests and when no database is configured.
#[derive(Default)]
pub struct InMemoryGenerationStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl InMemoryGenerationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl GenerationStore for InMemoryGenerationStore {
    async fn find(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(entry.key.clone(), entry.clone());
        Ok(())
    }
}
