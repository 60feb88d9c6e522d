//! Summarizer: turns the executed plan into a human-readable answer
//! (spec §4.7). Builds a concise-plain-text prompt, calls the
//! model-client in *summary* mode, and substitutes a deterministic
//! fallback when the model truncates.

use tracing::warn;

use crate::artifact::ArtifactItem;
use crate::errors::RouterError;
use crate::model_client::ModelClient;
use crate::plan::ExecutedStep;
use crate::truncator::{TRUNCATION_CAP_BYTES, truncate_for_summary};

const SYSTEM_PROMPT: &str = "You write concise, plain-text answers for a user who asked a \
question answered by a sequence of tool calls. No JSON, no markdown code fences, no headers. \
Refer to data you were given; do not invent facts absent from it.";

/// Build a final answer for `task`, given its executed steps and any
/// externalized artifacts. Falls back to a deterministic summary if the
/// model truncates (spec §4.7).
pub async fn summarize(
    client: &ModelClient,
    task: &str,
    executed_steps: &[ExecutedStep],
    manifest: &[ArtifactItem],
) -> String {
    let prompt = build_user_prompt(task, executed_steps, manifest);

    match client.summarize(SYSTEM_PROMPT, &prompt).await {
        Ok(response) if response.finish_reason.is_truncated() => {
            deterministic_fallback(executed_steps, manifest)
        }
        Ok(response) => response.content,
        Err(err) => {
            let failure = RouterError::ModelUnavailable(err.to_string());
            warn!(phase = failure.phase(), error = %failure, "summarization call failed, falling back to deterministic summary");
            deterministic_fallback(executed_steps, manifest)
        }
    }
}

fn build_user_prompt(task: &str, executed_steps: &[ExecutedStep], manifest: &[ArtifactItem]) -> String {
    let mut prompt = format!("Task: {task}\n\nStep outcomes:\n");
    for step in executed_steps {
        let truncated_result = step
            .result
            .as_ref()
            .map(|value| truncate_for_summary(value, TRUNCATION_CAP_BYTES));
        match (step.ok, &truncated_result, &step.error) {
            (true, Some(result), _) => {
                prompt.push_str(&format!("- {} (ok): {result}\n", step.name));
            }
            (false, _, Some(error)) => {
                prompt.push_str(&format!("- {} (error): {error}\n", step.name));
            }
            _ => prompt.push_str(&format!("- {} (no result)\n", step.name)),
        }
    }

    if !manifest.is_empty() {
        prompt.push_str("\nArtifacts:\n");
        for item in manifest {
            prompt.push_str(&format!(
                "- {} ({} bytes, sha256 {})\n",
                item.path.display(),
                item.bytes,
                item.sha256
            ));
        }
    }

    prompt
}

/// Deterministic text used when the model's summary is truncated: a
/// header, a numbered list of step outcomes, and a bullet list of
/// artifacts (spec §4.7).
pub(crate) fn deterministic_fallback(executed_steps: &[ExecutedStep], manifest: &[ArtifactItem]) -> String {
    let mut out = String::from("Summary truncated by model; showing raw step results instead.\n");

    for (index, step) in executed_steps.iter().enumerate() {
        let line = if step.ok {
            format!("{}. {}: ok", index + 1, step.name)
        } else {
            format!(
                "{}. {}: error ({})",
                index + 1,
                step.name,
                step.error.as_deref().unwrap_or("unknown error")
            )
        };
        out.push_str(&line);
        out.push('\n');
    }

    if !manifest.is_empty() {
        out.push_str("\nArtifacts:\n");
        for item in manifest {
            out.push_str(&format!(
                "- {} ({} bytes, sha256 {})\n",
                item.path.display(),
                item.bytes,
                item.sha256
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ToolSource;
    use serde_json::json;

    fn ok_step(name: &str) -> ExecutedStep {
        ExecutedStep::success(name, ToolSource::Local, json!({}), json!({"value": 1}))
    }

    fn failed_step(name: &str, error: &str) -> ExecutedStep {
        ExecutedStep::failure(name, ToolSource::Local, json!({}), error)
    }

    #[test]
    fn fallback_begins_with_the_required_header() {
        let text = deterministic_fallback(&[ok_step("get_thing")], &[]);
        assert!(text.starts_with("Summary truncated by model"));
    }

    #[test]
    fn fallback_lists_step_outcomes_numbered() {
        let steps = vec![ok_step("a"), failed_step("b", "boom")];
        let text = deterministic_fallback(&steps, &[]);
        assert!(text.contains("1. a: ok"));
        assert!(text.contains("2. b: error (boom)"));
    }

    #[test]
    fn fallback_omits_artifacts_section_when_manifest_is_empty() {
        let text = deterministic_fallback(&[ok_step("a")], &[]);
        assert!(!text.contains("Artifacts:"));
    }

    #[test]
    fn user_prompt_embeds_task_and_step_results() {
        let steps = vec![ok_step("get_thing")];
        let prompt = build_user_prompt("what is X", &steps, &[]);
        assert!(prompt.contains("what is X"));
        assert!(prompt.contains("get_thing (ok)"));
    }
}
