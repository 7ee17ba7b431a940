//! Run engine - executes declared phases strictly in order
//!
//! One run is one sequential pass over an action's phase list. Failure is
//! fail-fast: the failing phase is marked failed with its error captured,
//! later phases never start, and the partial result is still returned for
//! observability. Distinct runs may execute concurrently; their state maps
//! are fully disjoint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{RunResult, RunStatus};

use super::context::PhaseContext;
use super::registry::AgentRegistry;
use super::store::RunStore;

/// Request envelope for one agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    #[serde(default)]
    pub subject_id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub modifications: Option<Value>,
}

/// Run execution failures
#[derive(Debug, Error)]
pub enum RunError {
    /// Request rejected before a run was created
    #[error("invalid request: {0}")]
    Validation(String),

    /// A phase task failed; the partial result carries every phase entry
    #[error("run failed in phase '{phase}': {error}")]
    Failed {
        phase: String,
        error: String,
        partial: Box<RunResult>,
    },
}

/// Executes agent runs against a registry of actions
pub struct RunEngine {
    registry: AgentRegistry,
    store: Arc<dyn RunStore>,
}

impl RunEngine {
    pub fn new(registry: AgentRegistry, store: Arc<dyn RunStore>) -> Self {
        Self { registry, store }
    }

    /// Execute all declared phases for this request, in order.
    pub async fn execute(&self, request: RunRequest) -> Result<RunResult, RunError> {
        if request.subject_id.trim().is_empty() {
            return Err(RunError::Validation("subjectId is required".to_string()));
        }
        if request.action.trim().is_empty() {
            return Err(RunError::Validation("action is required".to_string()));
        }

        let phases = self
            .registry
            .get(&request.action)
            .ok_or_else(|| RunError::Validation(format!("unknown action: {}", request.action)))?;

        let labels: Vec<String> = phases.iter().map(|p| p.label.clone()).collect();
        let mut run = RunResult::new(request.action.as_str(), &labels);
        info!(run = %run.run_id, action = %request.action, phases = labels.len(), "run started");

        for (index, spec) in phases.iter().enumerate() {
            // Disjoint borrows of the run: current phase entry + shared state.
            let RunResult {
                run_id,
                phases: run_phases,
                state,
                ..
            } = &mut run;
            let phase = &mut run_phases[index];
            phase.mark_running();

            let mut ctx = PhaseContext {
                run_id: run_id.as_str(),
                request: &request,
                phase: &mut *phase,
                state,
                store: self.store.as_ref(),
            };

            match spec.task.run(&mut ctx).await {
                Ok(()) => {
                    phase.mark_completed();
                }
                Err(error) => {
                    let message = error.to_string();
                    phase.mark_failed(&message);
                    let failed_phase = phase.id.clone();
                    run.finish(RunStatus::Failed);
                    warn!(run = %run.run_id, phase = %failed_phase, %message, "run failed");
                    self.persist(&run).await;
                    return Err(RunError::Failed {
                        phase: failed_phase,
                        error: message,
                        partial: Box::new(run),
                    });
                }
            }
        }

        run.finish(RunStatus::Completed);
        info!(run = %run.run_id, "run completed");
        self.persist(&run).await;
        Ok(run)
    }

    /// Post-run persistence hook. Store trouble is logged, never surfaced:
    /// the run outcome already happened.
    async fn persist(&self, run: &RunResult) {
        if let Err(e) = self.store.save_run(run).await {
            warn!(run = %run.run_id, error = %e, "failed to persist run result");
        }
    }
}
