//! Compilation telemetry
//!
//! Invocations are counted by a fingerprint of sorted variable names plus a
//! hash of variable values. Raw values never leave this module, so the
//! counters support de-duplication analysis without leaking prompt content.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Canonical serialization of a variable map: keys sorted, compact JSON.
/// Used by both the content hash and the telemetry value hash so the two
/// never disagree about what "the same variables" means.
pub(crate) fn canonical_variables(variables: &Map<String, Value>) -> String {
    let sorted: BTreeMap<&String, &Value> = variables.iter().collect();
    serde_json::to_string(&sorted).unwrap_or_default()
}

/// Fingerprint for one invocation: `name1,name2,...:<sha256-prefix>`
pub fn variable_fingerprint(variables: &Map<String, Value>) -> String {
    let mut names: Vec<&str> = variables.keys().map(|k| k.as_str()).collect();
    names.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(canonical_variables(variables).as_bytes());
    let value_hash = format!("{:x}", hasher.finalize());

    format!("{}:{}", names.join(","), &value_hash[..16])
}

/// One telemetry counter row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRecord {
    pub template_id: String,
    pub fingerprint: String,
    pub count: u64,
}

/// Per-process compilation counters
#[derive(Debug, Default)]
pub struct PromptTelemetry {
    counts: RwLock<HashMap<(String, String), u64>>,
}

impl PromptTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one compilation of `template_id` with these variables
    pub fn record(&self, template_id: &str, variables: &Map<String, Value>) {
        let fingerprint = variable_fingerprint(variables);
        debug!(%template_id, %fingerprint, "prompt compiled");
        let mut counts = self.counts.write().expect("telemetry lock poisoned");
        *counts.entry((template_id.to_string(), fingerprint)).or_insert(0) += 1;
    }

    /// Snapshot all counters
    pub fn snapshot(&self) -> Vec<InvocationRecord> {
        let counts = self.counts.read().expect("telemetry lock poisoned");
        let mut records: Vec<InvocationRecord> = counts
            .iter()
            .map(|((template_id, fingerprint), count)| InvocationRecord {
                template_id: template_id.clone(),
                fingerprint: fingerprint.clone(),
                count: *count,
            })
            .collect();
        records.sort_by(|a, b| (&a.template_id, &a.fingerprint).cmp(&(&b.template_id, &b.fingerprint)));
        records
    }
}
