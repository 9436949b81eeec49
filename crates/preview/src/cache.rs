//! Short-lived in-memory cache of preview outcomes.
//!
//! Keyed by the first 2048 characters of the payload plus the title. Entries
//! expire after a TTL and are evicted lazily when read.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use variantflow_core::hashing::sha256_hex_parts;

use crate::outcome::PreviewOutcome;

/// Payload characters that participate in the key.
pub const KEY_PAYLOAD_CHARS: usize = 2048;

/// Default entry lifetime: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CachedPreview {
    outcome: PreviewOutcome,
    cached_at: Instant,
}

pub struct PreviewCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedPreview>>,
}

impl PreviewCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for a payload/title pair.
    pub fn key(payload: &str, title: &str) -> String {
        let prefix = match payload.char_indices().nth(KEY_PAYLOAD_CHARS) {
            Some((idx, _)) => &payload[..idx],
            None => payload,
        };
        sha256_hex_parts([prefix, title])
    }

    /// Fresh outcome for `key`, evicting it if it has expired.
    pub async fn get(&self, key: &str) -> Option<PreviewOutcome> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.cached_at.elapsed() < self.ttl => {
                    return Some(entry.outcome.clone());
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // Re-check under the write lock; a fresh insert may have raced in.
        if let Some(entry) = entries.get(key) {
            if entry.cached_at.elapsed() < self.ttl {
                return Some(entry.outcome.clone());
            }
            entries.remove(key);
            tracing::debug!(key = %key, "Evicted expired preview");
        }
        None
    }

    pub async fn insert(&self, key: String, outcome: PreviewOutcome) {
        self.entries.write().await.insert(
            key,
            CachedPreview {
                outcome,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.cached_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
