//! Built-in agent phases
//!
//! The `adjust_plan` agent: load the subject's current plan context, apply
//! the requested modifications, and summarize the result for persistence.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::context::{PhaseContext, PhaseError};
use super::registry::{PhaseSpec, PhaseTask};

/// Phase list for the `adjust_plan` action
pub fn adjust_plan_phases() -> Vec<PhaseSpec> {
    vec![
        PhaseSpec::new("load-context", Arc::new(LoadContext)),
        PhaseSpec::new("apply-adjustments", Arc::new(ApplyAdjustments)),
        PhaseSpec::new("summarize", Arc::new(Summarize)),
    ]
}

/// Seed run state from the request payload
struct LoadContext;

#[async_trait]
impl PhaseTask for LoadContext {
    async fn run(&self, ctx: &mut PhaseContext<'_>) -> Result<(), PhaseError> {
        let plan = match &ctx.request.payload {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            Some(other) => {
                return Err(PhaseError::Validation(format!(
                    "payload must be an object, got {}",
                    value_kind(other)
                )))
            }
            None => json!({}),
        };

        ctx.set_state("plan", plan.clone());
        ctx.emit_artifact("loaded-plan", plan);
        ctx.set_summary("plan context loaded");
        Ok(())
    }
}

/// Merge the request's modifications into the shared plan
struct ApplyAdjustments;

#[async_trait]
impl PhaseTask for ApplyAdjustments {
    async fn run(&self, ctx: &mut PhaseContext<'_>) -> Result<(), PhaseError> {
        let mods = match &ctx.request.modifications {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(PhaseError::Validation(format!(
                    "modifications must be an object, got {}",
                    value_kind(other)
                )))
            }
            None => Default::default(),
        };

        let mut plan = match ctx.state_value("plan") {
            Some(Value::Object(map)) => map.clone(),
            _ => Default::default(),
        };

        let applied = mods.len();
        for (key, value) in mods {
            plan.insert(key, value);
        }

        ctx.set_state("plan", Value::Object(plan.clone()));
        ctx.emit_artifact("adjusted-plan", Value::Object(plan));
        ctx.set_summary(format!("{} adjustment(s) applied", applied));
        Ok(())
    }
}

/// Produce the run summary from the final plan state
struct Summarize;

#[async_trait]
impl PhaseTask for Summarize {
    async fn run(&self, ctx: &mut PhaseContext<'_>) -> Result<(), PhaseError> {
        let field_count = ctx
            .state_value("plan")
            .and_then(|p| p.as_object())
            .map(|p| p.len())
            .unwrap_or(0);

        let summary = json!({
            "subjectId": ctx.request.subject_id,
            "planFields": field_count,
        });
        ctx.set_state("summary", summary.clone());
        ctx.emit_artifact("run-summary", summary);
        ctx.set_summary(format!("plan finalized with {} field(s)", field_count));
        Ok(())
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
