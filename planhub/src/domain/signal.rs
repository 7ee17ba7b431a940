//! Agent kinds and signal types
//!
//! Each upstream agent is one variant of the closed [`AgentKind`] enum. The
//! set is fixed at compile time; per-kind tuning lives in configuration keyed
//! by these variants rather than in a loosely-typed registry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upstream planning-signal agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Curriculum learning-objective agent
    Clo,
    /// Teaching-assistant agent
    Ta,
    /// Pacing agent
    Pace,
    /// Review-scheduling agent
    Review,
}

impl AgentKind {
    /// All configured agent kinds, in aggregation order
    pub const ALL: [AgentKind; 4] = [AgentKind::Clo, AgentKind::Ta, AgentKind::Pace, AgentKind::Review];

    /// Wire key used in upstream URLs and result maps
    pub fn key(&self) -> &'static str {
        match self {
            Self::Clo => "clo",
            Self::Ta => "ta",
            Self::Pace => "pace",
            Self::Review => "review",
        }
    }

    /// Parse a wire key back into a kind
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Freshness metadata attached to each agent's slot in an aggregation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Freshness {
    /// When the payload was last fetched from the upstream agent.
    /// None when the agent produced no signal at all.
    pub last_updated: Option<DateTime<Utc>>,
    /// When the payload leaves its freshness window
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the payload is past its freshness window
    pub is_stale: bool,
}

impl Freshness {
    /// Freshness for an agent that produced nothing (no cache, fetch failed)
    pub fn absent() -> Self {
        Self {
            last_updated: None,
            expires_at: None,
            is_stale: true,
        }
    }
}

/// One agent's most recent payload for a subject/topic window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSignal {
    /// Which agent produced this signal
    pub agent_key: AgentKind,
    /// The signal payload as returned by the agent
    pub payload: Value,
    /// When the payload was fetched with a fresh 200
    pub fetched_at: DateTime<Utc>,
    /// ETag returned alongside the payload, for conditional revalidation
    pub etag: Option<String>,
}

/// Per-subject cache of agent signals.
///
/// An entry's etag is only replaced on a fresh 200; a 304 revalidation leaves
/// both payload and etag untouched. The aggregator owns those rules — this
/// type is plain storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalCache {
    entries: HashMap<AgentKind, AgentSignal>,
}

impl SignalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: AgentKind) -> Option<&AgentSignal> {
        self.entries.get(&kind)
    }

    /// The etag to send as `If-None-Match`, if a cached entry carries one
    pub fn etag_for(&self, kind: AgentKind) -> Option<&str> {
        self.entries.get(&kind).and_then(|s| s.etag.as_deref())
    }

    pub fn insert(&mut self, signal: AgentSignal) {
        self.entries.insert(signal.agent_key, signal);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
