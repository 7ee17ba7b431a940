//! Phase-run domain types
//!
//! Tracks the state of one multi-phase agent run. Phase and run statuses only
//! move forward: pending -> running -> completed | failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::id::generate_id;

/// Status of a single phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Declared but not yet started
    #[default]
    Pending,
    /// Task function currently executing
    Running,
    /// Task function returned successfully
    Completed,
    /// Task function returned an error
    Failed,
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Phases still executing
    Running,
    /// Every phase completed
    Completed,
    /// A phase failed; later phases never started
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A timestamped artifact emitted by a phase task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Short artifact name (e.g. "plan-draft")
    pub name: String,
    /// Artifact payload
    pub data: Value,
    /// When the task emitted it
    pub created_at: DateTime<Utc>,
}

/// One named, ordered unit of work within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRun {
    /// Stable phase id (label slug)
    pub id: String,
    /// Human-readable phase label
    pub label: String,
    /// Current status
    pub status: PhaseStatus,
    /// Artifacts emitted so far
    pub artifacts: Vec<Artifact>,
    /// Optional one-line outcome set by the task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Free-form metadata; carries the error on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    /// Set when the phase starts running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Set at the terminal transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PhaseRun {
    /// Create a pending phase from its label
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: label.to_lowercase().replace(' ', "-"),
            label,
            status: PhaseStatus::Pending,
            artifacts: Vec::new(),
            summary: None,
            meta: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        debug!(phase = %self.id, "phase running");
        self.status = PhaseStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        debug!(phase = %self.id, "phase completed");
        self.status = PhaseStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Terminal failure; the error message is captured in phase meta
    pub fn mark_failed(&mut self, error: &str) {
        debug!(phase = %self.id, %error, "phase failed");
        self.status = PhaseStatus::Failed;
        self.completed_at = Some(Utc::now());
        let mut meta = match self.meta.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        meta.insert("error".to_string(), Value::String(error.to_string()));
        self.meta = Some(Value::Object(meta));
    }

    pub fn push_artifact(&mut self, name: impl Into<String>, data: Value) {
        self.artifacts.push(Artifact {
            name: name.into(),
            data,
            created_at: Utc::now(),
        });
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, PhaseStatus::Completed | PhaseStatus::Failed)
    }
}

/// One end-to-end execution of all declared phases for a request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Unique run identifier
    pub run_id: String,
    /// The agent action this run executed
    pub agent_id: String,
    /// Overall status
    pub status: RunStatus,
    /// Every declared phase, in order, whatever its terminal state
    pub phases: Vec<PhaseRun>,
    /// Run-scoped shared state, mutated by phases in sequence
    pub state: Map<String, Value>,
    /// Run start time
    pub started_at: DateTime<Utc>,
    /// Set when the run reaches a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunResult {
    /// Create a running result with all declared phases pending
    pub fn new(agent_id: impl Into<String>, phase_labels: &[String]) -> Self {
        let agent_id = agent_id.into();
        Self {
            run_id: generate_id("run", &agent_id),
            agent_id,
            status: RunStatus::Running,
            phases: phase_labels.iter().map(|label| PhaseRun::new(label.clone())).collect(),
            state: Map::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RunStatus::Completed | RunStatus::Failed)
    }
}
