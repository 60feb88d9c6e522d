//! Executor: runs a validated plan, respecting `parallel_group` cohorts,
//! auto-paginating successful calls, and externalizing oversized results
//! (spec §4.4). The largest single module in the router, mirroring its
//! share of the original system.
//!
//! Grounded on `oxicrab::agent::tools::registry::ToolRegistry
//! ::execute_with_guards` for the spawn + `tokio::time::timeout` +
//! `JoinError::is_panic()` isolation idiom — a panicking or hung handler
//! becomes a failed step, never a crashed process.

#[cfg(test)]
mod tests;

mod pagination;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{error, warn};

use crate::artifact::{ArtifactStore, MaybeExternalized};
use crate::catalog::ToolSource;
use crate::handlers::HandlerRegistry;
use crate::output::{OutputOptions, shape_result};
use crate::plan::{ExecutedStep, ModelPlan, PlanStep};
use crate::upstream::UpstreamPool;

#[derive(Clone)]
pub struct Executor {
    handlers: Arc<HandlerRegistry>,
    upstream: Arc<UpstreamPool>,
    artifact_store: Arc<ArtifactStore>,
    cohort_fanout: usize,
    pagination_depth: usize,
    step_timeout: Duration,
}

impl Executor {
    pub fn new(
        handlers: Arc<HandlerRegistry>,
        upstream: Arc<UpstreamPool>,
        artifact_store: Arc<ArtifactStore>,
        cohort_fanout: usize,
        pagination_depth: usize,
        step_timeout: Duration,
    ) -> Self {
        Self {
            handlers,
            upstream,
            artifact_store,
            cohort_fanout,
            pagination_depth,
            step_timeout,
        }
    }

    /// Run every step in `plan`, in order, honoring cohort boundaries.
    /// `plan_deadline` is an absolute instant; steps starting after it has
    /// passed are recorded as failed with `"deadline exceeded"` rather
    /// than invoked.
    pub async fn run(
        &self,
        plan: &ModelPlan,
        output: &OutputOptions,
        plan_deadline: Instant,
    ) -> Vec<ExecutedStep> {
        let mut results = Vec::with_capacity(plan.steps.len());
        let mut index = 0;

        while index < plan.steps.len() {
            if Instant::now() >= plan_deadline {
                for step in &plan.steps[index..] {
                    results.push(ExecutedStep::failure(
                        step.name.clone(),
                        step.source,
                        step.args.clone(),
                        "deadline exceeded",
                    ));
                }
                break;
            }

            let end = self.cohort_end(plan, index);
            let cohort = &plan.steps[index..end];

            if cohort.len() > 1 {
                let semaphore = Arc::new(Semaphore::new(self.cohort_fanout));
                let futures = cohort.iter().map(|step| {
                    let semaphore = semaphore.clone();
                    let this = self.clone();
                    let step = step.clone();
                    async move {
                        let _permit = semaphore
                            .acquire()
                            .await
                            .expect("semaphore is never closed");
                        this.execute_step(&step, output, plan_deadline).await
                    }
                });
                results.extend(join_all(futures).await);
            } else {
                results.push(self.execute_step(&cohort[0], output, plan_deadline).await);
            }

            index = end;
        }

        results
    }

    /// Contiguous run of steps from `start` sharing the same
    /// `parallel_group` label (non-neighboring reuses of a label are
    /// distinct cohorts, per spec §4.4).
    fn cohort_end(&self, plan: &ModelPlan, start: usize) -> usize {
        let Some(label) = &plan.steps[start].parallel_group else {
            return start + 1;
        };
        let mut end = start + 1;
        while end < plan.steps.len() && plan.steps[end].parallel_group.as_deref() == Some(label.as_str()) {
            end += 1;
        }
        end
    }

    async fn execute_step(
        &self,
        step: &PlanStep,
        output: &OutputOptions,
        plan_deadline: Instant,
    ) -> ExecutedStep {
        let remaining = plan_deadline.saturating_duration_since(Instant::now());
        let child_timeout = remaining.min(self.step_timeout);

        let mut pages = Vec::new();
        let mut args = step.args.clone();

        for depth in 0..=self.pagination_depth {
            let page = match self.dispatch_with_guards(step, args.clone(), child_timeout).await {
                Ok(value) => value,
                Err(reason) => {
                    if pages.is_empty() {
                        return ExecutedStep::failure(
                            step.name.clone(),
                            step.source,
                            step.args.clone(),
                            reason,
                        );
                    }
                    warn!(tool = %step.name, depth, "pagination follow-on call failed, returning pages collected so far");
                    break;
                }
            };

            let continuation = pagination::has_next(&page).then(|| pagination::next_cursor(&page)).flatten();
            pages.push(page);

            match continuation {
                Some((key, value)) if depth < self.pagination_depth => {
                    args = pagination::merge_cursor(&step.args, &key, value);
                }
                _ => break,
            }

            if Instant::now() >= plan_deadline {
                break;
            }
        }

        let aggregate = if pages.len() == 1 {
            pages.into_iter().next().unwrap()
        } else {
            pagination::aggregate_pages(pages)
        };

        let shaped = match shape_result(&aggregate, output, &step.name) {
            Ok(value) => value,
            Err(err) => {
                return ExecutedStep::failure(step.name.clone(), step.source, step.args.clone(), err.to_string());
            }
        };

        let result = match self.artifact_store.maybe_store(&step.name, &step.args, &shaped) {
            Ok(MaybeExternalized::Inline(value)) => value,
            Ok(MaybeExternalized::Externalized(reference)) => {
                serde_json::to_value(reference).unwrap_or(Value::Null)
            }
            Err(err) => {
                return ExecutedStep::failure(step.name.clone(), step.source, step.args.clone(), err.to_string());
            }
        };

        ExecutedStep::success(step.name.clone(), step.source, step.args.clone(), result)
    }

    /// Dispatch one call with the panic/timeout isolation idiom: spawn,
    /// `tokio::time::timeout`, `JoinError::is_panic()` converted to a
    /// typed failure instead of a propagated panic.
    async fn dispatch_with_guards(
        &self,
        step: &PlanStep,
        args: Value,
        timeout: Duration,
    ) -> Result<Value, String> {
        let handlers = self.handlers.clone();
        let upstream = self.upstream.clone();
        let source = step.source;
        let name = step.name.clone();

        let handle = tokio::task::spawn(async move {
            let call = async {
                match source {
                    ToolSource::Local => {
                        let handler = handlers
                            .get(&name)
                            .ok_or_else(|| anyhow::anyhow!("no local handler registered for '{name}'"))?;
                        handler.call(args).await
                    }
                    ToolSource::Upstream => upstream.call(&name, args).await,
                }
            };
            tokio::time::timeout(timeout, call).await
        });

        match handle.await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(err.to_string()),
            Ok(Err(_elapsed)) => Err(format!("step '{}' timed out after {:?}", step.name, timeout)),
            Err(join_err) => {
                if join_err.is_panic() {
                    error!(tool = %step.name, "step handler panicked");
                    Err(format!("step '{}' crashed unexpectedly", step.name))
                } else {
                    Err(format!("step '{}' was cancelled", step.name))
                }
            }
        }
    }
}
