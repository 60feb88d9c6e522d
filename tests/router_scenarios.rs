//! End-to-end `Router::query` scenarios, each wired against a mock model
//! endpoint and a small set of local handlers rather than a live model
//! or MCP server.

mod common;

use common::{FailingHandler, FixedHandler, PagingHandler, TestRouter, default_execution, plan_response};
use query_router::router::QueryRequest;
use serde_json::json;

#[tokio::test]
async fn dry_run_plans_without_executing() {
    let plan = json!({
        "steps": [{"name": "get_widget", "source": "local", "args": {}}],
        "final_answer_needed": true,
    });
    let handler = FixedHandler::new("get_widget", json!({"id": 1}));
    let test_router = TestRouter::build(
        vec![std::sync::Arc::new(handler)],
        plan_response(&plan.to_string(), "stop"),
        default_execution(),
    )
    .await;

    let request = QueryRequest {
        input: "fetch widget 1".to_string(),
        dry_run: true,
        ..QueryRequest::default()
    };
    let result = test_router.router.query(request).await.unwrap();

    assert!(result.executed_steps.is_empty());
    assert_eq!(result.plan.steps.len(), 1);
    assert_eq!(result.answer, "");
}

#[tokio::test]
async fn policy_denies_a_mutating_step_name() {
    // `delete_widget` is never allow-listable: the name-shape filter
    // rejects it before the allow-list is even consulted.
    let plan = json!({
        "steps": [{"name": "delete_widget", "source": "local", "args": {}}],
        "final_answer_needed": true,
    });
    let handler = FixedHandler::new("delete_widget", json!({}));
    let test_router = TestRouter::build(
        vec![std::sync::Arc::new(handler)],
        plan_response(&plan.to_string(), "stop"),
        default_execution(),
    )
    .await;

    let request = QueryRequest {
        input: "delete widget 1".to_string(),
        ..QueryRequest::default()
    };
    let err = test_router.router.query(request).await.unwrap_err();

    assert_eq!(err.phase(), "validate");
    assert!(err.to_string().contains("plan rejected"));
}

#[tokio::test]
async fn unknown_tool_name_is_rejected() {
    let plan = json!({
        "steps": [{"name": "nonexistent_tool", "source": "local", "args": {}}],
        "final_answer_needed": true,
    });
    let test_router = TestRouter::build(vec![], plan_response(&plan.to_string(), "stop"), default_execution()).await;

    let request = QueryRequest {
        input: "do the thing".to_string(),
        ..QueryRequest::default()
    };
    let err = test_router.router.query(request).await.unwrap_err();
    assert!(err.to_string().contains("unknown tool"));
}

#[tokio::test]
async fn auto_pagination_aggregates_across_pages() {
    let plan = json!({
        "steps": [{"name": "list_items", "source": "local", "args": {}}],
        "final_answer_needed": false,
    });
    let handler = PagingHandler::new();
    let test_router = TestRouter::build(
        vec![std::sync::Arc::new(handler)],
        plan_response(&plan.to_string(), "stop"),
        default_execution(),
    )
    .await;

    let request = QueryRequest {
        input: "list every item".to_string(),
        ..QueryRequest::default()
    };
    let result = test_router.router.query(request).await.unwrap();

    assert_eq!(result.executed_steps.len(), 1);
    let step = &result.executed_steps[0];
    assert!(step.ok);
    assert_eq!(step.result.as_ref().unwrap()["items"], json!([1, 2, 3, 4]));
    assert_eq!(step.result.as_ref().unwrap()["has_next"], json!(false));
}

#[tokio::test]
async fn failing_step_is_recorded_without_aborting_the_plan() {
    let plan = json!({
        "steps": [{"name": "flaky_lookup", "source": "local", "args": {}}],
        "final_answer_needed": false,
    });
    let test_router = TestRouter::build(
        vec![std::sync::Arc::new(FailingHandler)],
        plan_response(&plan.to_string(), "stop"),
        default_execution(),
    )
    .await;

    let request = QueryRequest {
        input: "look something up".to_string(),
        ..QueryRequest::default()
    };
    let result = test_router.router.query(request).await.unwrap();

    assert_eq!(result.executed_steps.len(), 1);
    let step = &result.executed_steps[0];
    assert!(!step.ok);
    assert_eq!(step.error.as_deref(), Some("upstream lookup failed"));
}

#[tokio::test]
async fn concurrent_cohort_preserves_plan_order_in_results() {
    let plan = json!({
        "steps": [
            {"name": "get_a", "source": "local", "args": {}, "parallel_group": "g1"},
            {"name": "get_b", "source": "local", "args": {}, "parallel_group": "g1"},
            {"name": "get_c", "source": "local", "args": {}, "parallel_group": "g1"},
        ],
        "final_answer_needed": false,
    });
    let handlers: Vec<std::sync::Arc<dyn query_router::handlers::LocalHandler>> = vec![
        std::sync::Arc::new(FixedHandler::new("get_a", json!({"v": "a"}))),
        std::sync::Arc::new(FixedHandler::new("get_b", json!({"v": "b"}))),
        std::sync::Arc::new(FixedHandler::new("get_c", json!({"v": "c"}))),
    ];
    let test_router = TestRouter::build(handlers, plan_response(&plan.to_string(), "stop"), default_execution()).await;

    let request = QueryRequest {
        input: "fetch a, b, and c".to_string(),
        ..QueryRequest::default()
    };
    let result = test_router.router.query(request).await.unwrap();

    let names: Vec<&str> = result.executed_steps.iter().map(|step| step.name.as_str()).collect();
    assert_eq!(names, vec!["get_a", "get_b", "get_c"]);
    assert!(result.executed_steps.iter().all(|step| step.ok));
}

#[tokio::test]
async fn truncated_plan_response_is_a_plan_error() {
    let test_router = TestRouter::build(
        vec![],
        plan_response("{\"steps\": [incomplete", "length"),
        default_execution(),
    )
    .await;

    let request = QueryRequest {
        input: "anything".to_string(),
        ..QueryRequest::default()
    };
    let err = test_router.router.query(request).await.unwrap_err();
    assert_eq!(err.phase(), "plan");
}

#[tokio::test]
async fn empty_input_is_rejected_before_any_model_call() {
    let test_router = TestRouter::build(vec![], plan_response("{\"steps\": []}", "stop"), default_execution()).await;

    let request = QueryRequest {
        input: "   ".to_string(),
        ..QueryRequest::default()
    };
    let err = test_router.router.query(request).await.unwrap_err();
    assert_eq!(err.phase(), "validate");
}
