//! `PlanStep` / `ModelPlan` / `ExecutedStep`: the data model the planner
//! produces, the validator checks, and the executor runs (spec §3).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::ToolSource;

/// Entry-point tool names — never valid as plan step targets (spec §3, §4.3).
pub const RESERVED_ENTRY_POINTS: &[&str] = &["query", "router"];

pub fn is_reserved_entry_point(name: &str) -> bool {
    RESERVED_ENTRY_POINTS.contains(&name)
}

/// One intended tool invocation proposed by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub name: String,
    pub source: ToolSource,
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_group: Option<String>,
}

/// Ordered sequence of `PlanStep` plus a flag for whether a final natural
/// language answer is wanted (spec §3 `ModelPlan`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPlan {
    pub steps: Vec<PlanStep>,
    #[serde(default = "default_true")]
    pub final_answer_needed: bool,
}

fn default_true() -> bool {
    true
}

/// Outcome of one `PlanStep` (spec §3 `ExecutedStep`). Invariant: exactly
/// one of `result`/`error` is populated — enforced by the constructors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedStep {
    pub name: String,
    pub source: ToolSource,
    pub args: Value,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutedStep {
    pub fn success(name: impl Into<String>, source: ToolSource, args: Value, result: Value) -> Self {
        Self {
            name: name.into(),
            source,
            args,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(
        name: impl Into<String>,
        source: ToolSource,
        args: Value,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            args,
            ok: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Output of a full router invocation (spec §3 `RouterResult`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterResult {
    pub plan: ModelPlan,
    pub executed_steps: Vec<ExecutedStep>,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Vec<crate::artifact::ArtifactItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_entry_points_are_recognized() {
        assert!(is_reserved_entry_point("query"));
        assert!(is_reserved_entry_point("router"));
        assert!(!is_reserved_entry_point("list_files"));
    }

    #[test]
    fn executed_step_success_has_result_not_error() {
        let step = ExecutedStep::success("t", ToolSource::Local, Value::Null, Value::from(1));
        assert!(step.ok);
        assert!(step.result.is_some());
        assert!(step.error.is_none());
    }

    #[test]
    fn executed_step_failure_has_error_not_result() {
        let step = ExecutedStep::failure("t", ToolSource::Local, Value::Null, "boom");
        assert!(!step.ok);
        assert!(step.result.is_none());
        assert_eq!(step.error.as_deref(), Some("boom"));
    }
}
