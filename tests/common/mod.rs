//! Shared test scaffolding: a paginating mock handler plus a `Router`
//! builder wired against a local `wiremock` stand-in for the model
//! endpoint, mirroring the `create_test_agent_with` helper in
//! `oxicrab`'s own integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use query_router::artifact::ArtifactStore;
use query_router::config::{ArtifactConfig, ExecutionConfig, ModelConfig, RouterConfig};
use query_router::handlers::{HandlerRegistry, LocalHandler};
use query_router::model_client::ModelClient;
use query_router::policy::Policy;
use query_router::router::Router;
use query_router::upstream::UpstreamPool;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A single-call handler that always returns `result` for a fixed name.
pub struct FixedHandler {
    name: String,
    description: String,
    result: Value,
}

impl FixedHandler {
    pub fn new(name: &str, result: Value) -> Self {
        Self {
            name: name.to_string(),
            description: format!("returns a fixed value for {name}"),
            result,
        }
    }
}

#[async_trait]
impl LocalHandler for FixedHandler {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn input_schema(&self) -> Value {
        Value::Null
    }
    async fn call(&self, _args: Value) -> anyhow::Result<Value> {
        Ok(self.result.clone())
    }
}

/// Returns two pages of `items` on consecutive calls, signaling
/// continuation via `has_next`/`cursor` on the first page only.
pub struct PagingHandler {
    calls: AtomicUsize,
}

impl PagingHandler {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LocalHandler for PagingHandler {
    fn name(&self) -> &str {
        "list_items"
    }
    fn description(&self) -> &str {
        "lists items, one page at a time"
    }
    fn input_schema(&self) -> Value {
        Value::Null
    }
    async fn call(&self, args: Value) -> anyhow::Result<Value> {
        let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
        if args.get("cursor").is_none() && call_index == 0 {
            Ok(json!({"items": [1, 2], "has_next": true, "cursor": "page2"}))
        } else {
            Ok(json!({"items": [3, 4], "has_next": false}))
        }
    }
}

/// A handler that always fails, for exercising step-error paths.
pub struct FailingHandler;

#[async_trait]
impl LocalHandler for FailingHandler {
    fn name(&self) -> &str {
        "flaky_lookup"
    }
    fn description(&self) -> &str {
        "always errors"
    }
    fn input_schema(&self) -> Value {
        Value::Null
    }
    async fn call(&self, _args: Value) -> anyhow::Result<Value> {
        anyhow::bail!("upstream lookup failed")
    }
}

/// A running mock model endpoint plus the fixture that keeps it alive.
pub struct MockModel {
    pub server: MockServer,
}

impl MockModel {
    /// Mount a model endpoint that returns `plan_body` for every request.
    /// Good enough for scenarios where planning and summarization share
    /// one scripted response body (tests only inspect `content`/`choices`).
    pub async fn respond_with(body: Value) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        Self { server }
    }

    pub fn base_url(&self) -> String {
        format!("{}/chat", self.server.uri())
    }
}

pub fn plan_response(content: &str, finish_reason: &str) -> Value {
    json!({
        "choices": [{
            "message": {"content": content},
            "finish_reason": finish_reason,
        }]
    })
}

pub struct TestRouter {
    pub router: Router,
    // Keeps the artifact directory and the mock model server alive for
    // the lifetime of the test.
    _tmp: TempDir,
    _mock: MockModel,
}

impl TestRouter {
    /// Build a `Router` with `handlers` registered and allow-listed, an
    /// isolated artifact directory, and a model client pointed at a mock
    /// endpoint that always answers with `model_response`.
    pub async fn build(handlers: Vec<Arc<dyn LocalHandler>>, model_response: Value, execution: ExecutionConfig) -> Self {
        Self::build_with_artifact_config(handlers, model_response, execution, ArtifactConfig::default()).await
    }

    /// Like [`Self::build`], but lets the scenario override the artifact
    /// store's externalization threshold (e.g. to force inline results
    /// past `inline_max_bytes`).
    pub async fn build_with_artifact_config(
        handlers: Vec<Arc<dyn LocalHandler>>,
        model_response: Value,
        execution: ExecutionConfig,
        artifact: ArtifactConfig,
    ) -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let mock = MockModel::respond_with(model_response).await;

        let mut registry = HandlerRegistry::new();
        let mut policy = Policy::new();
        for handler in handlers {
            policy.allow_local(handler.name().to_string());
            registry.register(handler);
        }

        let config = RouterConfig {
            artifact: ArtifactConfig {
                dir: tmp.path().to_path_buf(),
                ..artifact
            },
            model: ModelConfig {
                base_url: mock.base_url(),
                ..ModelConfig::default()
            },
            execution,
            upstream_servers: Vec::new(),
        };

        let model_client = ModelClient::new(config.model.clone()).expect("model client");
        let artifact_store = Arc::new(ArtifactStore::new(config.artifact.clone()).expect("artifact store"));
        let upstream = Arc::new(UpstreamPool::new());

        let router = Router::new(config, model_client, policy, Arc::new(registry), upstream, artifact_store);

        Self {
            router,
            _tmp: tmp,
            _mock: mock,
        }
    }
}

pub fn default_execution() -> ExecutionConfig {
    ExecutionConfig::default()
}
