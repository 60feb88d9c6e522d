//! Plan validator: structural and semantic checks on a `ModelPlan`
//! (spec §4.3). Fails fast — returns the first failing rule rather than
//! collecting all, per SPEC_FULL.md §9 (exceptions-as-control-flow
//! replaced by a single tagged error, not a report).


use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::catalog::ToolCatalog;
use crate::plan::{ModelPlan, PlanStep, is_reserved_entry_point};
use crate::policy::Policy;

/// Compiled-schema cache keyed by `(tool_name, sha256(schema))`. Entries are
/// immutable after insertion and concurrency-safe via a reader-writer lock —
/// reads (the common case) never block each other (spec §5).
#[derive(Default)]
pub struct SchemaCache {
    compiled: RwLock<HashMap<(String, String), Arc<jsonschema::Validator>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema_digest(schema: &Value) -> String {
        let canonical = serde_json::to_vec(schema).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        hex::encode(digest)
    }

    /// Return a compiled validator for `schema`, compiling and caching on
    /// first use. Returns `None` if `schema` is not a valid JSON Schema
    /// document (treated as "accepts anything" by callers).
    fn get_or_compile(&self, tool_name: &str, schema: &Value) -> Option<Arc<jsonschema::Validator>> {
        let key = (tool_name.to_string(), Self::schema_digest(schema));

        if let Some(found) = self.compiled.read().unwrap().get(&key) {
            return Some(found.clone());
        }

        let compiled = jsonschema::validator_for(schema).ok()?;
        let compiled = Arc::new(compiled);
        self.compiled
            .write()
            .unwrap()
            .insert(key, compiled.clone());
        Some(compiled)
    }
}

/// A single validation failure, carrying enough context for the
/// `PlanRejected` error envelope (spec §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub reason: String,
    pub step_name: Option<String>,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// Validate a plan against a policy, catalog, and step-count bound. Fails on
/// the first violation found, walking steps in order (spec §4.3, §8).
pub fn validate_plan(
    plan: &ModelPlan,
    policy: &Policy,
    catalog: &ToolCatalog,
    max_steps: usize,
    schema_cache: &SchemaCache,
) -> Result<(), ValidationFailure> {
    if plan.steps.is_empty() {
        return Err(ValidationFailure {
            reason: "plan must contain at least one step".to_string(),
            step_name: None,
        });
    }
    if plan.steps.len() > max_steps {
        return Err(ValidationFailure {
            reason: format!(
                "plan has {} steps, exceeding the bound of {max_steps}",
                plan.steps.len()
            ),
            step_name: None,
        });
    }

    for step in &plan.steps {
        validate_step(step, policy, catalog, schema_cache)?;
    }

    Ok(())
}

fn validate_step(
    step: &PlanStep,
    policy: &Policy,
    catalog: &ToolCatalog,
    schema_cache: &SchemaCache,
) -> Result<(), ValidationFailure> {
    let fail = |reason: String| ValidationFailure {
        reason,
        step_name: Some(step.name.clone()),
    };

    if step.name.is_empty() {
        return Err(fail("step name must not be empty".to_string()));
    }
    if is_reserved_entry_point(&step.name) {
        return Err(fail(format!(
            "'{}' is a reserved entry point and can never be a plan step",
            step.name
        )));
    }

    let Some(catalog_item) = catalog.get(&step.name) else {
        return Err(fail(format!("unknown tool '{}'", step.name)));
    };
    if catalog_item.source != step.source {
        return Err(fail(format!(
            "step source '{}' does not match catalog source '{}' for tool '{}'",
            step.source, catalog_item.source, step.name
        )));
    }

    if let Some(reason) = policy.deny_reason(step.source, &step.name) {
        return Err(fail(reason));
    }

    if !step.args.is_object() {
        return Err(fail(format!(
            "args for '{}' must be a JSON object",
            step.name
        )));
    }

    if !catalog_item.input_schema.is_null()
        && let Some(validator) = schema_cache.get_or_compile(&step.name, &catalog_item.input_schema)
    {
        if let Some(deepest) = deepest_error(&validator, &step.args) {
            return Err(fail(format!(
                "args for '{}' failed schema validation at {}: {}",
                step.name, deepest.0, deepest.1
            )));
        }
    }

    Ok(())
}

/// Run the compiled validator and surface the error with the deepest
/// instance location (spec §4.3: "the leaf with the deepest instance
/// location is surfaced").
fn deepest_error(validator: &jsonschema::Validator, instance: &Value) -> Option<(String, String)> {
    validator
        .iter_errors(instance)
        .map(|err| {
            let path = err.instance_path.to_string();
            let depth = path.matches('/').count();
            (depth, path, err.to_string())
        })
        .max_by_key(|(depth, ..)| *depth)
        .map(|(_, path, message)| (path, message))
}
