use super::*;
use crate::config::ArtifactConfig;
use crate::handlers::LocalHandler;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

struct EchoHandler;

#[async_trait]
impl LocalHandler for EchoHandler {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "echoes args"
    }
    fn input_schema(&self) -> Value {
        json!({})
    }
    async fn call(&self, args: Value) -> anyhow::Result<Value> {
        Ok(args)
    }
}

struct PanickingHandler;

#[async_trait]
impl LocalHandler for PanickingHandler {
    fn name(&self) -> &str {
        "panics"
    }
    fn description(&self) -> &str {
        "always panics"
    }
    fn input_schema(&self) -> Value {
        json!({})
    }
    async fn call(&self, _args: Value) -> anyhow::Result<Value> {
        panic!("boom");
    }
}

struct SlowHandler;

#[async_trait]
impl LocalHandler for SlowHandler {
    fn name(&self) -> &str {
        "slow"
    }
    fn description(&self) -> &str {
        "sleeps past its timeout"
    }
    fn input_schema(&self) -> Value {
        json!({})
    }
    async fn call(&self, _args: Value) -> anyhow::Result<Value> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(json!({"ok": true}))
    }
}

struct PaginatingHandler;

#[async_trait]
impl LocalHandler for PaginatingHandler {
    fn name(&self) -> &str {
        "list_items"
    }
    fn description(&self) -> &str {
        "returns two pages"
    }
    fn input_schema(&self) -> Value {
        json!({})
    }
    async fn call(&self, args: Value) -> anyhow::Result<Value> {
        if args.get("cursor").is_some() {
            Ok(json!({"items": [3, 4], "has_next": false}))
        } else {
            Ok(json!({"items": [1, 2], "has_next": true, "cursor": "page2"}))
        }
    }
}

struct BigResultHandler;

#[async_trait]
impl LocalHandler for BigResultHandler {
    fn name(&self) -> &str {
        "big_result"
    }
    fn description(&self) -> &str {
        "returns a payload over the inline ceiling"
    }
    fn input_schema(&self) -> Value {
        json!({})
    }
    async fn call(&self, _args: Value) -> anyhow::Result<Value> {
        Ok(json!({"data": "x".repeat(10_000)}))
    }
}

struct OrderTrackingHandler {
    name: &'static str,
    order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    counter: Arc<AtomicUsize>,
}

#[async_trait]
impl LocalHandler for OrderTrackingHandler {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "records invocation order"
    }
    fn input_schema(&self) -> Value {
        json!({})
    }
    async fn call(&self, _args: Value) -> anyhow::Result<Value> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        self.order.lock().unwrap().push(self.name);
        Ok(json!({"name": self.name}))
    }
}

fn step(name: &str, parallel_group: Option<&str>) -> PlanStep {
    PlanStep {
        name: name.to_string(),
        source: ToolSource::Local,
        args: json!({}),
        reason: None,
        parallel_group: parallel_group.map(str::to_string),
    }
}

fn test_executor(handlers: HandlerRegistry) -> (Executor, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(ArtifactConfig {
        dir: dir.path().to_path_buf(),
        inline_max_bytes: 1024,
        preview_bytes: 256,
        keep_index: true,
    })
    .unwrap();
    let executor = Executor::new(
        Arc::new(handlers),
        Arc::new(UpstreamPool::new()),
        Arc::new(store),
        8,
        8,
        Duration::from_millis(200),
    );
    (executor, dir)
}

fn far_deadline() -> Instant {
    Instant::now() + Duration::from_secs(60)
}

#[tokio::test]
async fn sequential_steps_run_in_plan_order() {
    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(EchoHandler));
    let (executor, _dir) = test_executor(handlers);

    let plan = ModelPlan {
        steps: vec![step("echo", None), step("echo", None)],
        final_answer_needed: true,
    };
    let results = executor.run(&plan, &OutputOptions::default(), far_deadline()).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.ok));
}

#[tokio::test]
async fn cohort_members_all_execute_and_results_preserve_plan_order() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let counter = Arc::new(AtomicUsize::new(0));

    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(OrderTrackingHandler {
        name: "a",
        order: order.clone(),
        counter: counter.clone(),
    }));
    handlers.register(Arc::new(OrderTrackingHandler {
        name: "b",
        order: order.clone(),
        counter: counter.clone(),
    }));
    let (executor, _dir) = test_executor(handlers);

    let plan = ModelPlan {
        steps: vec![step("a", Some("g1")), step("b", Some("g1"))],
        final_answer_needed: true,
    };
    let results = executor.run(&plan, &OutputOptions::default(), far_deadline()).await;

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    // executed_steps preserves plan order regardless of completion order
    assert_eq!(results[0].name, "a");
    assert_eq!(results[1].name, "b");
}

#[tokio::test]
async fn panicking_handler_becomes_a_failed_step_not_a_crash() {
    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(PanickingHandler));
    let (executor, _dir) = test_executor(handlers);

    let plan = ModelPlan {
        steps: vec![step("panics", None)],
        final_answer_needed: true,
    };
    let results = executor.run(&plan, &OutputOptions::default(), far_deadline()).await;
    assert!(!results[0].ok);
    assert!(results[0].error.as_ref().unwrap().contains("crashed"));
}

#[tokio::test]
async fn slow_handler_times_out_as_a_failed_step() {
    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(SlowHandler));
    let (executor, _dir) = test_executor(handlers);

    let plan = ModelPlan {
        steps: vec![step("slow", None)],
        final_answer_needed: true,
    };
    let results = executor.run(&plan, &OutputOptions::default(), far_deadline()).await;
    assert!(!results[0].ok);
    assert!(results[0].error.as_ref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn pagination_aggregates_list_items_across_pages() {
    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(PaginatingHandler));
    let (executor, _dir) = test_executor(handlers);

    let plan = ModelPlan {
        steps: vec![step("list_items", None)],
        final_answer_needed: true,
    };
    let results = executor.run(&plan, &OutputOptions::default(), far_deadline()).await;
    let result = results[0].result.as_ref().unwrap();
    assert_eq!(result["items"], json!([1, 2, 3, 4]));
    assert_eq!(result["has_next"], json!(false));
}

#[tokio::test]
async fn oversized_result_is_externalized_to_an_artifact_reference() {
    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(BigResultHandler));
    let (executor, _dir) = test_executor(handlers);

    let plan = ModelPlan {
        steps: vec![step("big_result", None)],
        final_answer_needed: true,
    };
    let results = executor.run(&plan, &OutputOptions::default(), far_deadline()).await;
    let result = results[0].result.as_ref().unwrap();
    assert!(result.get("artifact_uri").is_some());
}

#[tokio::test]
async fn steps_after_an_expired_deadline_are_marked_deadline_exceeded() {
    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(EchoHandler));
    let (executor, _dir) = test_executor(handlers);

    let plan = ModelPlan {
        steps: vec![step("echo", None), step("echo", None)],
        final_answer_needed: true,
    };
    let already_past = Instant::now() - Duration::from_secs(1);
    let results = executor.run(&plan, &OutputOptions::default(), already_past).await;
    assert!(results.iter().all(|r| !r.ok));
    assert!(results.iter().all(|r| r.error.as_deref() == Some("deadline exceeded")));
}

#[tokio::test]
async fn unregistered_tool_name_fails_the_step_without_panicking() {
    let handlers = HandlerRegistry::new();
    let (executor, _dir) = test_executor(handlers);

    let plan = ModelPlan {
        steps: vec![step("does_not_exist", None)],
        final_answer_needed: true,
    };
    let results = executor.run(&plan, &OutputOptions::default(), far_deadline()).await;
    assert!(!results[0].ok);
}
