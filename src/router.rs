//! Router orchestration (spec §3 `RouterResult`, §8 "ordering
//! guarantees"): context extraction, catalog snapshot, planning,
//! validation, execution, truncation, and summarization, wired into the
//! single operation the external interface exposes as `query`.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::info;

use crate::artifact::ArtifactStore;
use crate::catalog::ToolCatalog;
use crate::config::RouterConfig;
use crate::context::extract_context;
use crate::errors::RouterError;
use crate::executor::Executor;
use crate::handlers::HandlerRegistry;
use crate::model_client::ModelClient;
use crate::output::OutputOptions;
use crate::plan::RouterResult;
use crate::planner;
use crate::policy::Policy;
use crate::registry::ToolRegistry;
use crate::summarizer;
use crate::upstream::UpstreamPool;
use crate::validator::{SchemaCache, validate_plan};

/// Per-call parameters accepted by the `query` entry point (spec §6).
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub input: String,
    pub max_steps: Option<usize>,
    pub output: Option<OutputOptions>,
    pub dry_run: bool,
}

/// Everything the router needs for one request, owned by the long-lived
/// server process and shared across calls.
pub struct Router {
    config: RouterConfig,
    model_client: ModelClient,
    policy: Policy,
    handlers: Arc<HandlerRegistry>,
    upstream: Arc<UpstreamPool>,
    artifact_store: Arc<ArtifactStore>,
    schema_cache: SchemaCache,
    registry: Mutex<ToolRegistry>,
}

impl Router {
    pub fn new(
        config: RouterConfig,
        model_client: ModelClient,
        policy: Policy,
        handlers: Arc<HandlerRegistry>,
        upstream: Arc<UpstreamPool>,
        artifact_store: Arc<ArtifactStore>,
    ) -> Self {
        Self {
            config,
            model_client,
            policy,
            handlers,
            upstream,
            artifact_store,
            schema_cache: SchemaCache::new(),
            registry: Mutex::new(ToolRegistry::new(Vec::new())),
        }
    }

    /// The artifact store backing this router's resource facade.
    pub fn artifact_store(&self) -> &ArtifactStore {
        &self.artifact_store
    }

    /// Build the planner-facing catalog snapshot from local handlers plus
    /// every connected upstream's advertised tools (spec §4.10). Every
    /// item is registered into the long-lived [`ToolRegistry`] first, so
    /// its category assignment (and, eventually, fuzzy search over a wide
    /// catalog) runs through the same lookup future sessions will use.
    async fn build_catalog(&self) -> Result<ToolCatalog, RouterError> {
        let mut catalog = ToolCatalog::new();

        let mut local_items = self.handlers.catalog_items();
        let mut upstream_items = self
            .upstream
            .catalog_items()
            .await
            .map_err(RouterError::Internal)?;

        {
            let mut registry = self.registry.lock().expect("registry mutex poisoned");
            for item in local_items.iter().chain(upstream_items.iter()) {
                registry.register(item.clone());
            }
            for item in local_items.iter_mut().chain(upstream_items.iter_mut()) {
                item.category = registry.category_for(&item.name);
            }
        }

        for item in local_items {
            catalog.insert(item).map_err(RouterError::Internal)?;
        }
        for item in upstream_items {
            catalog.insert(item).map_err(RouterError::Internal)?;
        }

        Ok(catalog)
    }

    /// Run one `query` call end to end (spec §3, §8 scenarios 1-6).
    pub async fn query(&self, request: QueryRequest) -> Result<RouterResult, RouterError> {
        if request.input.trim().is_empty() {
            return Err(RouterError::InvalidInput("input must not be empty".to_string()));
        }

        let max_steps = request.max_steps.unwrap_or(self.config.execution.max_steps);
        let output = request.output.unwrap_or_default();
        let context = extract_context(&request.input);
        let catalog = self.build_catalog().await?;

        // Established before the first model call so planning and
        // summarization share the same overall budget the executor uses
        // (spec §5 "every operation accepts a cancellation handle").
        let plan_deadline = Instant::now() + self.config.execution.plan_deadline;

        let plan = self
            .plan_within_deadline(&request.input, &context, &catalog, max_steps, plan_deadline)
            .await?;

        validate_plan(&plan, &self.policy, &catalog, max_steps, &self.schema_cache).map_err(|failure| {
            RouterError::PlanRejected {
                reason: failure.reason,
                step_name: failure.step_name,
            }
        })?;

        if request.dry_run {
            info!(steps = plan.steps.len(), "dry run requested, skipping execution");
            return Ok(RouterResult {
                plan,
                executed_steps: vec![],
                answer: String::new(),
                manifest: None,
                debug: None,
            });
        }

        let executor = Executor::new(
            self.handlers.clone(),
            self.upstream.clone(),
            self.artifact_store.clone(),
            self.config.execution.cohort_fanout,
            self.config.execution.pagination_depth,
            self.config.execution.step_timeout,
        );

        let executed_steps = executor.run(&plan, &output, plan_deadline).await;

        let manifest = self.artifact_store.list();

        let answer = if plan.final_answer_needed {
            self.summarize_within_deadline(&request.input, &executed_steps, &manifest, plan_deadline)
                .await
        } else {
            String::new()
        };

        Ok(RouterResult {
            plan,
            executed_steps,
            answer,
            manifest: if manifest.is_empty() { None } else { Some(manifest) },
            debug: None,
        })
    }

    /// Run `planner::build_plan`, bounded by whatever's left of
    /// `deadline`. An already-elapsed deadline fails fast rather than
    /// issuing the HTTP call at all.
    async fn plan_within_deadline(
        &self,
        task: &str,
        context: &std::collections::BTreeMap<String, serde_json::Value>,
        catalog: &ToolCatalog,
        max_steps: usize,
        deadline: Instant,
    ) -> Result<crate::plan::ModelPlan, RouterError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(RouterError::DeadlineExceeded);
        }
        match tokio::time::timeout(
            remaining,
            planner::build_plan(&self.model_client, task, context, catalog, max_steps),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RouterError::DeadlineExceeded),
        }
    }

    /// Run `summarizer::summarize`, bounded by whatever's left of
    /// `deadline`. Summarization already substitutes a deterministic
    /// fallback on a model error; an elapsed deadline gets the same
    /// treatment instead of a hard failure, since the caller still wants
    /// an answer built from whatever executed.
    async fn summarize_within_deadline(
        &self,
        task: &str,
        executed_steps: &[crate::plan::ExecutedStep],
        manifest: &[crate::artifact::ArtifactItem],
        deadline: Instant,
    ) -> String {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return summarizer::deterministic_fallback(executed_steps, manifest);
        }
        match tokio::time::timeout(
            remaining,
            summarizer::summarize(&self.model_client, task, executed_steps, manifest),
        )
        .await
        {
            Ok(answer) => answer,
            Err(_) => summarizer::deterministic_fallback(executed_steps, manifest),
        }
    }
}
