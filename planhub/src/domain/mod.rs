//! Domain types for Planhub
//!
//! Core domain types: agent kinds and their signals, freshness metadata,
//! and the phase-run state machine.

mod id;
mod run;
mod signal;

pub use id::generate_id;
pub use run::{Artifact, PhaseRun, PhaseStatus, RunResult, RunStatus};
pub use signal::{AgentKind, AgentSignal, Freshness, SignalCache};
