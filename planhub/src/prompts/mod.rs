//! Prompt compilation and content-addressed caching
//!
//! Renders prompt templates against validated variables, hashes the result
//! with its generating inputs, and serves or stores the artifact through the
//! content-addressed `promptstore`. Identical `(template, variables,
//! version)` always reuse the same artifact.

mod compiler;
mod embedded;
mod manifest;
mod schema;
mod telemetry;

pub use compiler::{CompiledPrompt, PromptCompiler, PromptError};
pub use manifest::{
    ManifestCache, ManifestError, ManifestSource, RemoteManifestSource, TemplateManifest, TemplateSpec,
    DEFAULT_MANIFEST_TTL_SECS,
};
pub use schema::{validate_variables, VariableKind, VariableSpec, Violation};
pub use telemetry::{variable_fingerprint, InvocationRecord, PromptTelemetry};
