//! Cache freshness policy
//!
//! Pure time arithmetic: no I/O and no failure modes. Each agent kind gets
//! its own [`FreshnessConfig`]; a cached signal is usable without
//! revalidation while its age is under `max_age_hours`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Freshness;

/// Per-agent-kind freshness window.
///
/// `stale_after_hours` is kept as a separate knob for configs that want a
/// grace period beyond revalidation, but only `max_age_hours` drives the
/// fresh/stale decision. The two default to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    /// Maximum age before a cached signal must be revalidated
    #[serde(rename = "max-age-hours")]
    pub max_age_hours: i64,

    /// Age after which a signal is reported stale
    #[serde(rename = "stale-after-hours")]
    pub stale_after_hours: i64,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            max_age_hours: 24,
            stale_after_hours: 24,
        }
    }
}

impl FreshnessConfig {
    pub fn hours(max_age_hours: i64) -> Self {
        Self {
            max_age_hours,
            stale_after_hours: max_age_hours,
        }
    }
}

/// True iff the signal's age at `now` is strictly under the freshness window.
///
/// A `last_updated` in the future counts as age zero, so ages are never
/// negative.
pub fn is_fresh_at(last_updated: DateTime<Utc>, now: DateTime<Utc>, config: &FreshnessConfig) -> bool {
    let age = (now - last_updated).max(Duration::zero());
    age < Duration::hours(config.max_age_hours)
}

/// [`is_fresh_at`] against the current clock
pub fn is_fresh(last_updated: DateTime<Utc>, config: &FreshnessConfig) -> bool {
    is_fresh_at(last_updated, Utc::now(), config)
}

/// Full freshness metadata for a cached signal
pub fn calculate_freshness_at(
    last_updated: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &FreshnessConfig,
) -> Freshness {
    Freshness {
        last_updated: Some(last_updated),
        expires_at: Some(last_updated + Duration::hours(config.max_age_hours)),
        is_stale: !is_fresh_at(last_updated, now, config),
    }
}

/// [`calculate_freshness_at`] against the current clock
pub fn calculate_freshness(last_updated: DateTime<Utc>, config: &FreshnessConfig) -> Freshness {
    calculate_freshness_at(last_updated, Utc::now(), config)
}
