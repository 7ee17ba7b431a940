//! Signal aggregator
//!
//! Fans out one conditional fetch per configured agent kind, merges fresh,
//! revalidated, and cached outcomes, and keeps hit/miss accounting. A single
//! agent's failure never blocks or cancels its siblings: every branch
//! resolves to a value, and errors degrade to cache-or-null locally.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{AgentKind, AgentSignal, Freshness, SignalCache};

use super::fetch::{FetchClient, FetchOutcome, SignalQuery};
use super::freshness::{calculate_freshness_at, FreshnessConfig};
use super::store::SignalCacheStore;

/// Merged output of one aggregation call.
///
/// Invariant: `cache_hits + cache_misses + null_count() == signals.len()`,
/// the number of configured agent kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// Per-agent payload; None when the agent produced nothing at all
    pub signals: HashMap<AgentKind, Option<Value>>,
    /// Per-agent freshness metadata
    pub freshness: HashMap<AgentKind, Freshness>,
    /// Current etags, for the next conditional round
    pub etags: HashMap<AgentKind, String>,
    /// Agents served from cache (revalidated or fallback)
    pub cache_hits: u32,
    /// Agents that returned a fresh payload
    pub cache_misses: u32,
}

impl AggregationResult {
    /// Agents with no signal at all (failed with no cached fallback)
    pub fn null_count(&self) -> u32 {
        self.signals.values().filter(|s| s.is_none()).count() as u32
    }

    /// Degraded mode: at least one agent's signal is entirely unavailable.
    /// Staleness alone never triggers this.
    pub fn is_degraded(&self) -> bool {
        self.null_count() > 0
    }

    /// Agents whose signal is present and inside its freshness window
    pub fn fresh_count(&self) -> u32 {
        self.freshness.values().filter(|f| !f.is_stale).count() as u32
    }
}

/// Cumulative counters across aggregation calls
#[derive(Debug, Default)]
pub struct AggregatorMetrics {
    calls: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    nulls: AtomicU64,
}

/// Point-in-time view of [`AggregatorMetrics`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub null_signals: u64,
}

impl AggregatorMetrics {
    fn record(&self, result: &AggregationResult) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(result.cache_hits as u64, Ordering::Relaxed);
        self.misses.fetch_add(result.cache_misses as u64, Ordering::Relaxed);
        self.nulls.fetch_add(result.null_count() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            cache_hits: self.hits.load(Ordering::Relaxed),
            cache_misses: self.misses.load(Ordering::Relaxed),
            null_signals: self.nulls.load(Ordering::Relaxed),
        }
    }
}

/// How one agent branch resolved
struct Resolution {
    signal: Option<Value>,
    freshness: Freshness,
    etag: Option<String>,
    entry: Option<AgentSignal>,
    counted: Counted,
}

enum Counted {
    Hit,
    Miss,
    Null,
}

/// Aggregates signals across all configured agent kinds
pub struct SignalAggregator {
    client: FetchClient,
    freshness: HashMap<AgentKind, FreshnessConfig>,
    cache_store: Arc<SignalCacheStore>,
    metrics: Arc<AggregatorMetrics>,
}

impl SignalAggregator {
    pub fn new(
        client: FetchClient,
        freshness: HashMap<AgentKind, FreshnessConfig>,
        cache_store: Arc<SignalCacheStore>,
    ) -> Self {
        Self {
            client,
            freshness,
            cache_store,
            metrics: Arc::new(AggregatorMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<AggregatorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Fetch and merge every configured agent's signal for one query.
    ///
    /// `force_refresh` skips cached etags and fallbacks, so every agent is
    /// re-fetched unconditionally (failures then yield null signals).
    pub async fn get_all_signals(&self, query: &SignalQuery, force_refresh: bool) -> AggregationResult {
        let cached = if force_refresh {
            SignalCache::new()
        } else {
            self.cache_store.load(&query.subject_id, &query.topic).await
        };

        let branches = AgentKind::ALL.map(|kind| {
            let cached_entry = cached.get(kind).cloned();
            async move { (kind, self.resolve_one(kind, query, cached_entry).await) }
        });

        let mut result = AggregationResult {
            signals: HashMap::new(),
            freshness: HashMap::new(),
            etags: HashMap::new(),
            cache_hits: 0,
            cache_misses: 0,
        };
        let mut next_cache = SignalCache::new();

        for (kind, resolution) in join_all(branches).await {
            match resolution.counted {
                Counted::Hit => result.cache_hits += 1,
                Counted::Miss => result.cache_misses += 1,
                Counted::Null => {}
            }
            if let Some(etag) = &resolution.etag {
                result.etags.insert(kind, etag.clone());
            }
            if let Some(entry) = resolution.entry {
                next_cache.insert(entry);
            }
            result.signals.insert(kind, resolution.signal);
            result.freshness.insert(kind, resolution.freshness);
        }

        self.cache_store.save(&query.subject_id, &query.topic, next_cache).await;
        self.metrics.record(&result);

        info!(
            subject = %query.subject_id,
            topic = %query.topic,
            hits = result.cache_hits,
            misses = result.cache_misses,
            nulls = result.null_count(),
            "aggregated agent signals"
        );
        result
    }

    /// Resolve one agent: conditional fetch, then merge against the cache.
    /// Never returns an error; failures degrade to cache-or-null.
    async fn resolve_one(&self, kind: AgentKind, query: &SignalQuery, cached: Option<AgentSignal>) -> Resolution {
        let config = self.freshness.get(&kind).copied().unwrap_or_default();
        let etag = cached.as_ref().and_then(|c| c.etag.as_deref());
        let now = Utc::now();

        match self.client.fetch(kind, query, etag).await {
            Ok(FetchOutcome::NotModified) => match cached {
                Some(prev) => {
                    debug!(agent = %kind, "revalidated, serving cached payload");
                    Resolution {
                        signal: Some(prev.payload.clone()),
                        freshness: calculate_freshness_at(prev.fetched_at, now, &config),
                        etag: prev.etag.clone(),
                        entry: Some(prev),
                        counted: Counted::Hit,
                    }
                }
                // 304 with nothing cached: nothing to serve.
                None => {
                    warn!(agent = %kind, "not-modified without cached entry");
                    Resolution {
                        signal: None,
                        freshness: Freshness::absent(),
                        etag: None,
                        entry: None,
                        counted: Counted::Null,
                    }
                }
            },
            Ok(FetchOutcome::Fresh { payload, etag }) => {
                debug!(agent = %kind, "fresh payload fetched");
                let entry = AgentSignal {
                    agent_key: kind,
                    payload: payload.clone(),
                    fetched_at: now,
                    etag: etag.clone(),
                };
                Resolution {
                    signal: Some(payload),
                    freshness: calculate_freshness_at(now, now, &config),
                    etag,
                    entry: Some(entry),
                    counted: Counted::Miss,
                }
            }
            Err(error) => {
                warn!(agent = %kind, code = error.code(), %error, "fetch failed, degrading");
                match cached {
                    Some(prev) => Resolution {
                        signal: Some(prev.payload.clone()),
                        freshness: calculate_freshness_at(prev.fetched_at, now, &config),
                        etag: prev.etag.clone(),
                        entry: Some(prev),
                        counted: Counted::Hit,
                    },
                    None => Resolution {
                        signal: None,
                        freshness: Freshness::absent(),
                        etag: None,
                        entry: None,
                        counted: Counted::Null,
                    },
                }
            }
        }
    }
}
