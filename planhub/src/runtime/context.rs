//! Phase execution context
//!
//! The handle bundle passed to every phase task: the originating request,
//! the phase's own entry (for summary/meta/artifacts), the run store
//! collaborator, and the run-scoped shared state map. Phases run strictly
//! sequentially, so the state map needs no synchronization.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::PhaseRun;

use super::engine::RunRequest;
use super::store::RunStore;

/// Errors a phase task can raise
#[derive(Debug, Error)]
pub enum PhaseError {
    /// Bad input discovered mid-run; not retried
    #[error("validation failed: {0}")]
    Validation(String),

    /// Anything else the task could not recover from
    #[error("{0}")]
    Task(String),
}

/// Context handed to one phase task invocation
pub struct PhaseContext<'a> {
    /// The run's id, for logging and artifact correlation
    pub run_id: &'a str,
    /// The request that started the run
    pub request: &'a RunRequest,
    /// This phase's entry; tasks may set summary and meta
    pub phase: &'a mut PhaseRun,
    /// Run-scoped shared state, visible to every later phase
    pub state: &'a mut Map<String, Value>,
    /// External storage collaborator
    pub store: &'a dyn RunStore,
}

impl<'a> PhaseContext<'a> {
    /// Append a timestamped artifact to this phase
    pub fn emit_artifact(&mut self, name: impl Into<String>, data: Value) {
        let name = name.into();
        debug!(run = %self.run_id, phase = %self.phase.id, %name, "artifact emitted");
        self.phase.push_artifact(name, data);
    }

    /// Set this phase's one-line summary
    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.phase.summary = Some(summary.into());
    }

    /// Write a shared state entry for later phases
    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }

    /// Read a shared state entry written by an earlier phase
    pub fn state_value(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MemoryRunStore;

    #[test]
    fn test_context_mutations_land_on_phase_and_state() {
        let request = RunRequest {
            subject_id: "user-1".to_string(),
            action: "adjust_plan".to_string(),
            payload: None,
            modifications: None,
        };
        let mut phase = PhaseRun::new("draft");
        let mut state = Map::new();
        let store = MemoryRunStore::new();

        let mut ctx = PhaseContext {
            run_id: "r-1",
            request: &request,
            phase: &mut phase,
            state: &mut state,
            store: &store,
        };

        ctx.set_state("weeks", serde_json::json!(4));
        ctx.emit_artifact("draft", serde_json::json!({"ok": true}));
        ctx.set_summary("drafted");

        assert_eq!(ctx.state_value("weeks"), Some(&serde_json::json!(4)));
        assert_eq!(phase.artifacts.len(), 1);
        assert_eq!(phase.summary.as_deref(), Some("drafted"));
        assert_eq!(state["weeks"], 4);
    }
}
