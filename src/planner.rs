//! Planner: turns a raw task plus context hints into a validated-shape
//! `ModelPlan` (spec §4.2). Builds the system/user prompt, calls the
//! model-client in *plan* mode, and defensively parses the response.
//!
//! Grounded on `oxicrab::providers::base`'s request-shaping conventions,
//! narrowed to a single non-tool-calling JSON-plan round trip; the
//! defensive-parsing step reuses `model_client::extract_json` verbatim.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::catalog::ToolCatalog;
use crate::errors::RouterError;
use crate::model_client::{ModelClient, extract_json};
use crate::plan::ModelPlan;

const SYSTEM_PROMPT: &str = "You are a tool-call planner. You must respond with a single JSON \
object and nothing else: no prose, no markdown code fences, no explanation. The object must \
match the ModelPlan schema you are given.";

const PLAN_SCHEMA_SUMMARY: &str = "ModelPlan { steps: [{name, source: \"local\"|\"upstream\", \
args: object, reason?: string, parallel_group?: string}], final_answer_needed: bool }";

/// Build a plan for `task`, calling the model in plan mode and defensively
/// parsing its response (spec §4.2).
pub async fn build_plan(
    client: &ModelClient,
    task: &str,
    context: &BTreeMap<String, Value>,
    catalog: &ToolCatalog,
    max_steps: usize,
) -> Result<ModelPlan, RouterError> {
    let user_prompt = build_user_prompt(task, context, catalog, max_steps);

    let response = client
        .plan(SYSTEM_PROMPT, &user_prompt)
        .await
        .map_err(|err| RouterError::ModelUnavailable(err.to_string()))?;

    let Some(value) = extract_json(&response.content) else {
        if response.finish_reason.is_truncated() {
            return Err(RouterError::PlanTruncated);
        }
        return Err(RouterError::PlanParse {
            reason: "no JSON object or array found in model response".to_string(),
            raw: Some(response.content),
        });
    };

    match serde_json::from_value::<ModelPlan>(value) {
        Ok(plan) => Ok(plan),
        Err(err) => {
            if response.finish_reason.is_truncated() {
                Err(RouterError::PlanTruncated)
            } else {
                Err(RouterError::PlanParse {
                    reason: err.to_string(),
                    raw: Some(response.content),
                })
            }
        }
    }
}

fn build_user_prompt(
    task: &str,
    context: &BTreeMap<String, Value>,
    catalog: &ToolCatalog,
    max_steps: usize,
) -> String {
    let catalog_summary: Vec<Value> = catalog
        .iter()
        .map(|item| {
            json!({
                "name": item.name,
                "source": item.source.as_str(),
                "description": item.description,
                "input_schema": item.input_schema,
            })
        })
        .collect();

    let body = json!({
        "task": task,
        "context": context,
        "max_steps": max_steps,
        "policy": {
            "must_not": ["create", "update", "merge", "delete", "write", "push"],
        },
        "workflow_hints": [
            "prefer tools with pagination support for large result sets",
            "prefer the summary view for large dashboards",
            "never propose a step named 'query' or 'router'",
        ],
        "catalog": catalog_summary,
        "response_schema": PLAN_SCHEMA_SUMMARY,
    });

    serde_json::to_string_pretty(&body).unwrap_or_default()
}
