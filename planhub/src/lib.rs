//! Planhub - planning signal aggregation and multi-phase agent runtime
//!
//! Planhub is the planning backbone for a learning platform. It gathers
//! per-subject planning signals from independent upstream agents, each with
//! its own staleness tolerance, keeps a content-addressed cache of compiled
//! prompt text, and executes multi-phase agent runs behind a small HTTP API.
//!
//! # Core Concepts
//!
//! - **Conditional aggregation**: every agent fetch revalidates with ETags;
//!   one agent's failure degrades to cache-or-null without touching siblings
//! - **Content-addressed prompts**: identical (template, variables, version)
//!   always reuse the same stored artifact
//! - **Sequential phases**: agent runs execute declared phases strictly in
//!   order over run-scoped shared state, failing fast with partial results
//!
//! # Modules
//!
//! - [`signals`] - conditional fetch client and signal aggregator
//! - [`prompts`] - prompt compilation and the content-addressed cache
//! - [`runtime`] - the phase state machine and agent registry
//! - [`server`] - HTTP surface
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod prompts;
pub mod runtime;
pub mod server;
pub mod signals;

// Re-export commonly used types
pub use config::{AgentsConfig, Config, FetchConfig, ManifestConfig, ServerConfig, StorageConfig};
pub use domain::{AgentKind, AgentSignal, Artifact, Freshness, PhaseRun, PhaseStatus, RunResult, RunStatus, SignalCache};
pub use prompts::{CompiledPrompt, ManifestCache, PromptCompiler, PromptError, PromptTelemetry};
pub use runtime::{AgentRegistry, MemoryRunStore, PhaseContext, PhaseError, PhaseSpec, PhaseTask, RunEngine, RunError, RunRequest, RunStore};
pub use server::{create_router, AppState, JsonResponse};
pub use signals::{
    AggregationResult, FetchClient, FetchError, FetchOutcome, FreshnessConfig, HttpTransport, SignalAggregator,
    SignalCacheStore, SignalQuery, SignalTransport,
};
