//! Prompt compiler
//!
//! Validates, renders, hashes, and stores one prompt compilation. The
//! pipeline is strictly ordered: schema validation fails before any hashing
//! or I/O, and storage failures degrade to an inline result instead of
//! failing the operation.

use std::collections::BTreeMap;
use std::sync::Arc;

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use promptstore::{ArtifactKey, ArtifactStore, StoreError, UrlSigner};

use super::manifest::ManifestCache;
use super::schema::{validate_variables, Violation};
use super::telemetry::{canonical_variables, PromptTelemetry};

/// Errors that fail a compilation outright
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("variable validation failed: {}", format_violations(.0))]
    Validation(Vec<Violation>),

    #[error("template not found: {template_id}")]
    NotFound { template_id: String },

    #[error("template render failed: {0}")]
    Render(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn format_violations(violations: &[Violation]) -> String {
    violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ")
}

/// Result of one compilation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPrompt {
    /// SHA-256 over template text + canonical variables + version
    pub content_hash: String,
    /// Deterministic artifact path in the store
    pub storage_path: String,
    /// 60-second signed access URL; None only when persistence failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,
    /// Whether an existing artifact was reused
    pub cached: bool,
    /// Rendered text, present only when persistence failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_text: Option<String>,
}

/// Compiles prompt templates into content-addressed artifacts
pub struct PromptCompiler {
    store: Arc<dyn ArtifactStore>,
    signer: UrlSigner,
    manifest: ManifestCache,
    telemetry: Arc<PromptTelemetry>,
    hbs: Handlebars<'static>,
}

impl PromptCompiler {
    pub fn new(store: Arc<dyn ArtifactStore>, signer: UrlSigner, manifest: ManifestCache) -> Self {
        // Prompts are plain text, not HTML: render variables verbatim.
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);

        Self {
            store,
            signer,
            manifest,
            telemetry: Arc::new(PromptTelemetry::new()),
            hbs,
        }
    }

    pub fn telemetry(&self) -> Arc<PromptTelemetry> {
        Arc::clone(&self.telemetry)
    }

    /// Compile `template_id` for `subject_id` with the given variables.
    ///
    /// Idempotent and content-addressed: identical (template, variables,
    /// version) always yields the same hash and reuses the same artifact.
    pub async fn compile(
        &self,
        template_id: &str,
        subject_id: &str,
        variables: &Map<String, Value>,
    ) -> Result<CompiledPrompt, PromptError> {
        let spec = self
            .manifest
            .resolve(template_id)
            .await
            .ok_or_else(|| PromptError::NotFound {
                template_id: template_id.to_string(),
            })?;

        // Validation runs before any hashing or storage I/O.
        validate_variables(&spec.variables, variables).map_err(PromptError::Validation)?;

        let template_text = match self.store.download(&spec.storage_path) {
            Ok(text) => text,
            Err(StoreError::NotFound { .. }) => {
                return Err(PromptError::NotFound {
                    template_id: template_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let content_hash = content_hash(&template_text, variables, &spec.version);
        let key = ArtifactKey::new(template_id, subject_id, content_hash.clone());

        self.telemetry.record(template_id, variables);

        // Existing artifact: skip render and upload entirely.
        if self.store.exists(&key).unwrap_or(false) {
            debug!(%key, "artifact cache hit");
            return Ok(CompiledPrompt {
                content_hash,
                storage_path: key.path(),
                signed_url: Some(self.signer.sign(&key.path()).url),
                cached: true,
                inline_text: None,
            });
        }

        let rendered = self.render(&template_text, variables)?;

        match self.store.upload(&key, &rendered) {
            Ok(_) => {
                info!(%key, "compiled prompt stored");
                Ok(CompiledPrompt {
                    content_hash,
                    storage_path: key.path(),
                    signed_url: Some(self.signer.sign(&key.path()).url),
                    cached: false,
                    inline_text: None,
                })
            }
            Err(e) => {
                // Persistence failure degrades to inline delivery.
                warn!(%key, error = %e, "artifact upload failed, returning inline text");
                Ok(CompiledPrompt {
                    content_hash,
                    storage_path: key.path(),
                    signed_url: None,
                    cached: false,
                    inline_text: Some(rendered),
                })
            }
        }
    }

    /// Substitute `{{VAR}}` placeholders with each variable's string form.
    /// Unresolved placeholders render as empty strings (handlebars default),
    /// which is the intended policy rather than leaving them literal.
    fn render(&self, template_text: &str, variables: &Map<String, Value>) -> Result<String, PromptError> {
        let data: BTreeMap<&str, String> = variables
            .iter()
            .map(|(name, value)| (name.as_str(), string_form(value)))
            .collect();

        self.hbs
            .render_template(template_text, &data)
            .map_err(|e| PromptError::Render(e.to_string()))
    }
}

/// The string form a variable takes inside rendered text
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// SHA-256 hex over template text, canonical variables, and version
fn content_hash(template_text: &str, variables: &Map<String, Value>, version: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(template_text.as_bytes());
    hasher.update(canonical_variables(variables).as_bytes());
    hasher.update(version.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptstore::FsArtifactStore;
    use serde_json::json;
    use tempfile::tempdir;

    const CLO_TEMPLATE: &str = "Plan a {{TRACK_LABEL}} track at {{TIME_PER_WEEK}} hours per week. Level: {{LEVEL}}";

    fn vars(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn compiler_with_store(dir: &std::path::Path) -> PromptCompiler {
        let store = FsArtifactStore::open(dir).unwrap();
        store.put_raw("templates/clo_v3.txt", CLO_TEMPLATE).unwrap();
        store
            .put_raw("templates/ta_v2.txt", "Help with {{TOPIC}}. Struggles: {{STRUGGLES}}")
            .unwrap();

        PromptCompiler::new(
            Arc::new(store),
            UrlSigner::new("http://localhost:8700/artifacts", "test-secret"),
            ManifestCache::embedded_only(),
        )
    }

    #[tokio::test]
    async fn test_compile_twice_is_idempotent() {
        let temp = tempdir().unwrap();
        let compiler = compiler_with_store(temp.path());
        let variables = vars(json!({"TRACK_LABEL": "AI/ML", "TIME_PER_WEEK": 5}));

        let first = compiler.compile("clo_v3", "user-1", &variables).await.unwrap();
        let second = compiler.compile("clo_v3", "user-1", &variables).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.content_hash, second.content_hash);
        assert_eq!(first.storage_path, second.storage_path);
        // A fresh signed URL is issued either way.
        assert!(second.signed_url.is_some());
    }

    #[tokio::test]
    async fn test_changing_any_variable_changes_hash() {
        let temp = tempdir().unwrap();
        let compiler = compiler_with_store(temp.path());

        let base = compiler
            .compile("clo_v3", "user-1", &vars(json!({"TRACK_LABEL": "AI/ML", "TIME_PER_WEEK": 5})))
            .await
            .unwrap();
        let label_changed = compiler
            .compile("clo_v3", "user-1", &vars(json!({"TRACK_LABEL": "Systems", "TIME_PER_WEEK": 5})))
            .await
            .unwrap();
        let hours_changed = compiler
            .compile("clo_v3", "user-1", &vars(json!({"TRACK_LABEL": "AI/ML", "TIME_PER_WEEK": 6})))
            .await
            .unwrap();

        assert_ne!(base.content_hash, label_changed.content_hash);
        assert_ne!(base.content_hash, hours_changed.content_hash);
        assert_ne!(label_changed.content_hash, hours_changed.content_hash);
    }

    #[tokio::test]
    async fn test_variable_order_does_not_change_hash() {
        let temp = tempdir().unwrap();
        let compiler = compiler_with_store(temp.path());

        let a = compiler
            .compile("clo_v3", "user-1", &vars(json!({"TRACK_LABEL": "AI/ML", "TIME_PER_WEEK": 5})))
            .await
            .unwrap();
        let b = compiler
            .compile("clo_v3", "user-1", &vars(json!({"TIME_PER_WEEK": 5, "TRACK_LABEL": "AI/ML"})))
            .await
            .unwrap();

        assert_eq!(a.content_hash, b.content_hash);
        assert!(b.cached);
    }

    #[tokio::test]
    async fn test_rendered_artifact_content() {
        let temp = tempdir().unwrap();
        let compiler = compiler_with_store(temp.path());
        let variables = vars(json!({"TRACK_LABEL": "AI/ML", "TIME_PER_WEEK": 5}));

        let compiled = compiler.compile("clo_v3", "user-1", &variables).await.unwrap();

        let store = FsArtifactStore::open(temp.path()).unwrap();
        let content = store.download(&compiled.storage_path).unwrap();
        // Unresolved {{LEVEL}} renders empty, not literal.
        assert_eq!(content, "Plan a AI/ML track at 5 hours per week. Level: ");
    }

    #[tokio::test]
    async fn test_validation_fails_before_any_io() {
        let temp = tempdir().unwrap();
        let compiler = compiler_with_store(temp.path());

        let err = compiler
            .compile("clo_v3", "user-1", &vars(json!({"TIME_PER_WEEK": 900})))
            .await
            .unwrap_err();

        match err {
            PromptError::Validation(violations) => assert_eq!(violations.len(), 2),
            other => panic!("expected Validation, got {:?}", other),
        }
        // Nothing was stored for the subject.
        assert!(!temp.path().join("clo_v3").exists());
    }

    #[tokio::test]
    async fn test_unknown_template_is_not_found() {
        let temp = tempdir().unwrap();
        let compiler = compiler_with_store(temp.path());

        let err = compiler.compile("nope_v9", "user-1", &Map::new()).await.unwrap_err();
        assert!(matches!(err, PromptError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_template_text_is_not_found() {
        // Manifest knows session_brief_v1 but its text was never seeded.
        let temp = tempdir().unwrap();
        let compiler = compiler_with_store(temp.path());

        let err = compiler
            .compile("session_brief_v1", "user-1", &vars(json!({"TOPIC": "graphs"})))
            .await
            .unwrap_err();
        assert!(matches!(err, PromptError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_array_variable_renders_as_json() {
        let temp = tempdir().unwrap();
        let compiler = compiler_with_store(temp.path());

        let compiled = compiler
            .compile(
                "ta_v2",
                "user-1",
                &vars(json!({"TOPIC": "graphs", "STRUGGLES": ["bfs", "dfs"]})),
            )
            .await
            .unwrap();

        let store = FsArtifactStore::open(temp.path()).unwrap();
        let content = store.download(&compiled.storage_path).unwrap();
        assert_eq!(content, r#"Help with graphs. Struggles: ["bfs","dfs"]"#);
    }

    /// Store whose reads work but whose artifact writes always fail
    struct ReadOnlyStore {
        inner: FsArtifactStore,
    }

    impl ArtifactStore for ReadOnlyStore {
        fn exists(&self, key: &ArtifactKey) -> Result<bool, StoreError> {
            self.inner.exists(key)
        }

        fn download(&self, path: &str) -> Result<String, StoreError> {
            self.inner.download(path)
        }

        fn upload(&self, _key: &ArtifactKey, _content: &str) -> Result<bool, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    #[tokio::test]
    async fn test_upload_failure_degrades_to_inline_text() {
        let temp = tempdir().unwrap();
        let inner = FsArtifactStore::open(temp.path()).unwrap();
        inner.put_raw("templates/clo_v3.txt", CLO_TEMPLATE).unwrap();

        let compiler = PromptCompiler::new(
            Arc::new(ReadOnlyStore { inner }),
            UrlSigner::new("http://localhost:8700/artifacts", "test-secret"),
            ManifestCache::embedded_only(),
        );

        let compiled = compiler
            .compile("clo_v3", "user-1", &vars(json!({"TRACK_LABEL": "AI/ML", "TIME_PER_WEEK": 5})))
            .await
            .expect("storage failure is not a hard failure");

        assert!(!compiled.cached);
        assert!(compiled.signed_url.is_none());
        assert_eq!(
            compiled.inline_text.as_deref(),
            Some("Plan a AI/ML track at 5 hours per week. Level: ")
        );
        // Hash and path are still reported for observability.
        assert_eq!(compiled.content_hash.len(), 64);
        assert!(compiled.storage_path.ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_telemetry_records_compilations() {
        let temp = tempdir().unwrap();
        let compiler = compiler_with_store(temp.path());
        let variables = vars(json!({"TRACK_LABEL": "AI/ML", "TIME_PER_WEEK": 5}));

        compiler.compile("clo_v3", "user-1", &variables).await.unwrap();
        compiler.compile("clo_v3", "user-2", &variables).await.unwrap();

        let records = compiler.telemetry().snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].count, 2);
    }
}
