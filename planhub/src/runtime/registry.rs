//! Agent action registry
//!
//! Maps an action name to its ordered phase list. Built once at startup and
//! shared by reference; tasks are trait objects so agents can mix built-in
//! and custom phases.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::context::{PhaseContext, PhaseError};

/// One unit of phase work
#[async_trait]
pub trait PhaseTask: Send + Sync {
    async fn run(&self, ctx: &mut PhaseContext<'_>) -> Result<(), PhaseError>;
}

/// A declared phase: display label plus its task
#[derive(Clone)]
pub struct PhaseSpec {
    pub label: String,
    pub task: Arc<dyn PhaseTask>,
}

impl PhaseSpec {
    pub fn new(label: impl Into<String>, task: Arc<dyn PhaseTask>) -> Self {
        Self {
            label: label.into(),
            task,
        }
    }
}

/// Registry of agent actions and their phase lists
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Vec<PhaseSpec>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action's ordered phases (replaces any prior registration)
    pub fn register(&mut self, action: impl Into<String>, phases: Vec<PhaseSpec>) {
        self.agents.insert(action.into(), phases);
    }

    pub fn get(&self, action: &str) -> Option<&[PhaseSpec]> {
        self.agents.get(action).map(|v| v.as_slice())
    }

    pub fn actions(&self) -> Vec<&str> {
        let mut actions: Vec<&str> = self.agents.keys().map(|k| k.as_str()).collect();
        actions.sort_unstable();
        actions
    }

    /// Registry with the built-in agents installed
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("adjust_plan", super::builtin::adjust_plan_phases());
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopTask;

    #[async_trait]
    impl PhaseTask for NoopTask {
        async fn run(&self, _ctx: &mut PhaseContext<'_>) -> Result<(), PhaseError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = AgentRegistry::new();
        registry.register(
            "review_week",
            vec![PhaseSpec::new("collect", Arc::new(NoopTask)), PhaseSpec::new("score", Arc::new(NoopTask))],
        );

        let phases = registry.get("review_week").expect("registered");
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].label, "collect");
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_builtins_include_adjust_plan() {
        let registry = AgentRegistry::with_builtins();
        let phases = registry.get("adjust_plan").expect("builtin registered");
        assert_eq!(phases.len(), 3);
        assert_eq!(registry.actions(), vec!["adjust_plan"]);
    }
}
