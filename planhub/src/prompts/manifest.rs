//! Template manifest resolution
//!
//! The manifest maps template ids to their version, storage path, and
//! variable schema. It is fetched remotely and cached with a TTL; on any
//! fetch failure the embedded copy takes over transparently. The cache is an
//! explicit component owned by the compiler, not process-wide state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::embedded;
use super::schema::VariableSpec;

/// Default manifest cache TTL
pub const DEFAULT_MANIFEST_TTL_SECS: u64 = 300;

/// Errors fetching the remote manifest (always recoverable via the
/// embedded fallback)
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest fetch failed: {0}")]
    Fetch(String),

    #[error("manifest body is not valid: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One template's manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Version participating in the content hash
    pub version: String,
    /// Blob-store path of the raw template text
    pub storage_path: String,
    /// Variable schema
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
}

/// The full template manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateManifest {
    pub templates: HashMap<String, TemplateSpec>,
}

impl TemplateManifest {
    /// The compiled-in fallback copy
    pub fn embedded() -> Self {
        serde_json::from_str(embedded::MANIFEST).expect("embedded manifest is valid JSON")
    }
}

/// Seam for fetching the manifest document
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch(&self) -> Result<TemplateManifest, ManifestError>;
}

/// HTTP manifest source
pub struct RemoteManifestSource {
    http: reqwest::Client,
    url: String,
}

impl RemoteManifestSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ManifestSource for RemoteManifestSource {
    async fn fetch(&self) -> Result<TemplateManifest, ManifestError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ManifestError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ManifestError::Fetch(format!("status {}", response.status())));
        }

        let body = response.text().await.map_err(|e| ManifestError::Fetch(e.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// TTL-cached manifest with embedded fallback
pub struct ManifestCache {
    source: Option<Box<dyn ManifestSource>>,
    ttl: Duration,
    cached: RwLock<Option<(Instant, TemplateManifest)>>,
}

impl ManifestCache {
    pub fn new(source: Box<dyn ManifestSource>, ttl: Duration) -> Self {
        Self {
            source: Some(source),
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// A cache that only ever serves the embedded manifest (tests, offline)
    pub fn embedded_only() -> Self {
        Self {
            source: None,
            ttl: Duration::from_secs(DEFAULT_MANIFEST_TTL_SECS),
            cached: RwLock::new(None),
        }
    }

    /// Resolve one template's spec; `None` when the manifest has no entry
    pub async fn resolve(&self, template_id: &str) -> Option<TemplateSpec> {
        self.manifest().await.templates.get(template_id).cloned()
    }

    async fn manifest(&self) -> TemplateManifest {
        if let Some((fetched_at, manifest)) = self.cached.read().await.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return manifest.clone();
            }
        }

        match &self.source {
            Some(source) => match source.fetch().await {
                Ok(manifest) => {
                    debug!(templates = manifest.templates.len(), "refreshed template manifest");
                    *self.cached.write().await = Some((Instant::now(), manifest.clone()));
                    manifest
                }
                Err(e) => {
                    // Remote failure is not an error for callers: serve the
                    // embedded copy and retry the remote on the next miss.
                    warn!(error = %e, "manifest fetch failed, using embedded fallback");
                    TemplateManifest::embedded()
                }
            },
            None => TemplateManifest::embedded(),
        }
    }
}
