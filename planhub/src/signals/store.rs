//! Signal cache store
//!
//! Explicit collaborator owning per-subject signal caches, constructed once
//! at startup and passed by reference. Keyed by (subject, topic); entries are
//! whole [`SignalCache`] snapshots recomputed by each aggregation call.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::SignalCache;

/// In-memory store of signal caches, keyed by subject + topic
#[derive(Debug, Default)]
pub struct SignalCacheStore {
    caches: RwLock<HashMap<(String, String), SignalCache>>,
}

impl SignalCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the cache for a subject/topic (empty when none stored yet)
    pub async fn load(&self, subject_id: &str, topic: &str) -> SignalCache {
        self.caches
            .read()
            .await
            .get(&(subject_id.to_string(), topic.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the cache for a subject/topic with a recomputed snapshot
    pub async fn save(&self, subject_id: &str, topic: &str, cache: SignalCache) {
        debug!(%subject_id, %topic, entries = cache.len(), "persisting signal cache");
        self.caches
            .write()
            .await
            .insert((subject_id.to_string(), topic.to_string()), cache);
    }
}
