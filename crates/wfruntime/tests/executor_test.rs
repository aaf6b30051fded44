// crates/wfruntime/tests/executor_test.rs

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use wfcore::{
    ExecutionEvent, FlowError, Node, NodeContext, NodeError, NodeSpec, NodeType, Value, Workflow,
    WorkflowError,
};
use wfruntime::{FlowRuntime, NodeMetadata, NodeRegistry, RuntimeConfig, WorkflowExecutor};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Returns its `values` parameter
struct ValuesNode;

#[async_trait]
impl Node for ValuesNode {
    fn node_type(&self) -> NodeType {
        NodeType::Set
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        Ok(ctx.parameter("values").cloned().unwrap_or(Value::Null))
    }
}

/// Echoes what it was given so tests can inspect threading and resolution
struct EchoNode;

#[async_trait]
impl Node for EchoNode {
    fn node_type(&self) -> NodeType {
        NodeType::Code
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        Ok(json!({
            "node": ctx.node_id,
            "inputs": ctx.inputs,
            "parameters": ctx.parameters,
        }))
    }
}

/// Always fails
struct FailingNode;

#[async_trait]
impl Node for FailingNode {
    fn node_type(&self) -> NodeType {
        NodeType::HttpRequest
    }

    async fn execute(&self, _ctx: NodeContext) -> Result<Value, NodeError> {
        Err(NodeError::Http {
            status: 503,
            reason: "Service Unavailable".to_string(),
        })
    }
}

fn test_runtime() -> FlowRuntime {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(ValuesNode), NodeMetadata::new("values", "test"));
    registry.register(Arc::new(EchoNode), NodeMetadata::new("echo", "test"));
    registry.register(Arc::new(FailingNode), NodeMetadata::new("fails", "test"));
    FlowRuntime::with_registry(Arc::new(registry), RuntimeConfig::default())
}

fn set_node(id: &str, values: Value) -> NodeSpec {
    NodeSpec::new(id, NodeType::Set).with_parameter("values", values)
}

fn echo_node(id: &str) -> NodeSpec {
    NodeSpec::new(id, NodeType::Code)
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<ExecutionEvent>) -> Vec<ExecutionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_order_respects_every_connection() {
    init_tracing();

    let mut wf = Workflow::new();
    for id in ["fetch", "merge", "left", "right", "report"] {
        wf.add_node(echo_node(id));
    }
    wf.connect("merge", "report");
    wf.connect("fetch", "left");
    wf.connect("fetch", "right");
    wf.connect("left", "merge");
    wf.connect("right", "merge");

    let order = WorkflowExecutor::execution_order(&wf).unwrap();
    assert_eq!(order.len(), 5);
    let pos = |id: &str| order.iter().position(|n| n == id).unwrap();
    for conn in &wf.connections {
        assert!(
            pos(&conn.from) < pos(&conn.to),
            "{} should run before {}",
            conn.from,
            conn.to
        );
    }
    assert_eq!(order, vec!["fetch", "left", "right", "merge", "report"]);
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let runtime = test_runtime();

    let mut wf = Workflow::new();
    wf.add_node(set_node("a", json!({"n": 1})));
    wf.add_node(set_node("b", json!({"n": 2})));
    wf.add_node(echo_node("c"));
    wf.connect("b", "c");
    wf.connect("a", "c");

    let first = runtime.execute(&wf).await.unwrap();
    let second = runtime.execute(&wf).await.unwrap();

    assert_eq!(first.order, second.order);
    assert_eq!(first.nodes_executed, second.nodes_executed);
    assert_eq!(first.data, second.data);
    assert_ne!(first.execution_id, second.execution_id);
}

#[tokio::test]
async fn test_cycle_fails_without_result() {
    let runtime = test_runtime();
    let mut rx = runtime.subscribe_events();

    let mut wf = Workflow::new();
    wf.add_node(echo_node("A"));
    wf.add_node(echo_node("B"));
    wf.connect("A", "B");
    wf.connect("B", "A");

    let err = runtime.execute(&wf).await.unwrap_err();
    assert!(
        err.to_string().contains("Circular dependency detected in workflow"),
        "unexpected error: {}",
        err
    );
    assert!(matches!(
        err,
        FlowError::Workflow(WorkflowError::CircularDependency { ref nodes }) if nodes == &["A", "B"]
    ));

    let events = drain(&mut rx);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ExecutionEvent::NodeStarted { .. })));
}

#[tokio::test]
async fn test_independent_start_nodes_both_run() {
    let runtime = test_runtime();

    let mut wf = Workflow::new();
    wf.add_node(set_node("first", json!({"which": "first"})));
    wf.add_node(set_node("second", json!({"which": "second"})));

    let result = runtime.execute(&wf).await.unwrap();
    assert!(result.success);
    assert_eq!(result.nodes_executed, 2);
    assert_eq!(result.data, json!({"which": "second"}));
    assert_eq!(result.result_of("first"), Some(&json!({"which": "first"})));
}

#[tokio::test]
async fn test_inputs_follow_connection_order() {
    let runtime = test_runtime();

    let mut wf = Workflow::new();
    wf.add_node(set_node("a", json!({"id": "a"})));
    wf.add_node(set_node("b", json!({"id": "b"})));
    wf.add_node(echo_node("sink").with_parameter("source", "={{ $json.id }}"));
    wf.connect("b", "sink");
    wf.connect("a", "sink");

    let result = runtime.execute(&wf).await.unwrap();
    assert_eq!(result.data["inputs"], json!([{"id": "b"}, {"id": "a"}]));
    // only the first input is visible to expressions
    assert_eq!(result.data["parameters"]["source"], json!("b"));
}

#[tokio::test]
async fn test_parameters_resolved_against_first_input() {
    let runtime = test_runtime();

    let mut wf = Workflow::new();
    wf.add_node(set_node("config", json!({"endpoint": "http://x/y", "retries": 3})));
    wf.add_node(
        echo_node("call")
            .with_parameter("url", "={{$json.endpoint}}")
            .with_parameter("method", "GET")
            .with_parameter(
                "nested",
                json!({"list": ["={{ 1 + $json.retries }}", 7, null], "plain": "hello"}),
            ),
    );
    wf.connect("config", "call");

    let result = runtime.execute(&wf).await.unwrap();
    let params = &result.data["parameters"];
    assert_eq!(params["url"], json!("http://x/y"));
    assert_eq!(params["method"], json!("GET"));
    assert_eq!(params["nested"], json!({"list": [4, 7, null], "plain": "hello"}));
}

#[tokio::test]
async fn test_expression_without_inputs_sees_empty_object() {
    let runtime = test_runtime();

    let mut wf = Workflow::new();
    wf.add_node(
        echo_node("solo")
            .with_parameter("keys", "={{ Object.keys($json).length }}")
            .with_parameter("missing", "={{ $json.nothing }}"),
    );

    let result = runtime.execute(&wf).await.unwrap();
    assert_eq!(result.data["parameters"]["keys"], json!(0));
    assert_eq!(result.data["parameters"]["missing"], Value::Null);
}

#[tokio::test]
async fn test_failed_expression_keeps_literal() {
    init_tracing();
    let runtime = test_runtime();

    let mut wf = Workflow::new();
    wf.add_node(
        echo_node("solo")
            .with_parameter("broken", "={{ $json.a.b.c }}")
            .with_parameter("syntax", "={{ 1 + }}"),
    );

    let result = runtime.execute(&wf).await.unwrap();
    // an unreachable path is null, not a failure
    assert_eq!(result.data["parameters"]["broken"], Value::Null);
    assert_eq!(result.data["parameters"]["syntax"], json!("={{ 1 + }}"));
}

#[tokio::test]
async fn test_null_upstream_keeps_path_literals() {
    init_tracing();
    let runtime = test_runtime();

    let mut wf = Workflow::new();
    wf.add_node(set_node("empty", Value::Null));
    wf.add_node(
        echo_node("after")
            .with_parameter("path", "={{$json.x}}")
            .with_parameter("fallback", "={{ $json.x || 'd' }}")
            .with_parameter("computed", "={{ $json === null }}"),
    );
    wf.connect("empty", "after");

    let result = runtime.execute(&wf).await.unwrap();
    let params = &result.data["parameters"];
    assert_eq!(params["path"], json!("={{$json.x}}"));
    assert_eq!(params["fallback"], json!("={{ $json.x || 'd' }}"));
    assert_eq!(params["computed"], json!(true));
}

#[tokio::test]
async fn test_path_prefix_selects_property_lookup() {
    let runtime = test_runtime();

    let mut wf = Workflow::new();
    wf.add_node(set_node("config", json!({"retries": 3, "a + 1": "odd key"})));
    wf.add_node(
        echo_node("call")
            .with_parameter("sum", "={{ $json.retries + 1 }}")
            .with_parameter("key", "={{ $json.a + 1 }}")
            .with_parameter("evaluated", "={{ ($json.retries + 1) }}")
            .with_parameter("multiline", "={{ $json.retries\n + 1 }}")
            .with_parameter("blank", "={{ }}"),
    );
    wf.connect("config", "call");

    let result = runtime.execute(&wf).await.unwrap();
    let params = &result.data["parameters"];
    assert_eq!(params["sum"], Value::Null);
    assert_eq!(params["key"], json!("odd key"));
    assert_eq!(params["evaluated"], json!(4));
    assert_eq!(params["multiline"], json!("={{ $json.retries\n + 1 }}"));
    assert_eq!(params["blank"], Value::Null);
}

#[tokio::test]
async fn test_deeply_nested_expression_keeps_literal() {
    let runtime = test_runtime();
    let template = format!("={{{{ {}1{} }}}}", "[".repeat(1000), "]".repeat(1000));

    let mut wf = Workflow::new();
    wf.add_node(echo_node("solo").with_parameter("deep", template.as_str()));

    let result = runtime.execute(&wf).await.unwrap();
    assert_eq!(result.data["parameters"]["deep"], json!(template));
}

#[tokio::test]
async fn test_node_failure_aborts_run() {
    let runtime = test_runtime();
    let mut rx = runtime.subscribe_events();

    let mut wf = Workflow::new();
    wf.add_node(set_node("start", json!({})));
    wf.add_node(NodeSpec::new("call", NodeType::HttpRequest));
    wf.add_node(echo_node("after"));
    wf.connect("start", "call");
    wf.connect("call", "after");

    let err = runtime.execute(&wf).await.unwrap_err();
    match &err {
        FlowError::Node { node_id, source } => {
            assert_eq!(node_id, "call");
            assert_eq!(source.to_string(), "HTTP Request failed: 503 Service Unavailable");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let events = drain(&mut rx);
    let started: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ExecutionEvent::NodeStarted { node_id, .. } => Some(node_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec!["start", "call"]);
    assert!(events.iter().any(|e| matches!(
        e,
        ExecutionEvent::NodeFailed { node_id, .. } if node_id == "call"
    )));
    assert!(matches!(
        events.last(),
        Some(ExecutionEvent::WorkflowCompleted { success: false, .. })
    ));
}

#[tokio::test]
async fn test_unknown_node_type() {
    let runtime = FlowRuntime::new();

    let mut wf = Workflow::new();
    wf.add_node(set_node("a", json!({"x": 1})));

    let err = runtime.execute(&wf).await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Workflow(WorkflowError::UnknownNodeType(ref t)) if t == "set"
    ));
    assert_eq!(err.to_string(), "Workflow error: Unknown node type: set");
}

#[tokio::test]
async fn test_dangling_connection_rejected_before_running() {
    let runtime = test_runtime();
    let mut rx = runtime.subscribe_events();

    let mut wf = Workflow::new();
    wf.add_node(set_node("a", json!({})));
    wf.connect("a", "ghost");

    let err = runtime.execute(&wf).await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Workflow(WorkflowError::InvalidConnection { ref missing, .. }) if missing == "ghost"
    ));
    assert!(!drain(&mut rx)
        .iter()
        .any(|e| matches!(e, ExecutionEvent::NodeStarted { .. })));
}

#[tokio::test]
async fn test_result_serialization() {
    let runtime = test_runtime();

    let mut wf = Workflow::new();
    wf.add_node(set_node("only", json!({"x": 1})));

    let result = runtime.execute(&wf).await.unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["success"], json!(true));
    assert_eq!(value["data"], json!({"x": 1}));
    assert_eq!(value["nodesExecuted"], json!(1));
    assert!(value["executionTime"].is_u64());
    assert!(value["executionId"].is_string());
    assert!(value.get("results").is_none());
    assert!(value.get("order").is_none());
}

#[tokio::test]
async fn test_event_sequence() {
    let runtime = test_runtime();
    let mut rx = runtime.subscribe_events();

    let mut wf = Workflow::new();
    wf.add_node(set_node("a", json!({"x": 1})));
    wf.add_node(echo_node("b"));
    wf.connect("a", "b");

    runtime.execute(&wf).await.unwrap();

    let kinds: Vec<String> = drain(&mut rx)
        .iter()
        .map(|e| match e {
            ExecutionEvent::WorkflowStarted { .. } => "workflow_started".to_string(),
            ExecutionEvent::NodeStarted { node_id, .. } => format!("started:{}", node_id),
            ExecutionEvent::NodeCompleted { node_id, .. } => format!("completed:{}", node_id),
            ExecutionEvent::NodeFailed { node_id, .. } => format!("failed:{}", node_id),
            ExecutionEvent::NodeEvent { .. } => "node_event".to_string(),
            ExecutionEvent::WorkflowCompleted { success, .. } => format!("workflow_completed:{}", success),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "workflow_started",
            "started:a",
            "completed:a",
            "started:b",
            "completed:b",
            "workflow_completed:true",
        ]
    );
}
