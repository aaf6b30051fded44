// crates/wfnodes/tests/nodes_test.rs

use serde_json::{json, Map};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wfcore::{EventEmitter, FlowError, Node, NodeContext, NodeError, NodeSpec, NodeType, Value, Workflow};
use wfexpr::Limits;
use wfnodes::{default_registry, CodeNode, SetNode};
use wfruntime::{FlowRuntime, RuntimeConfig};

fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn context(parameters: Value, inputs: Vec<Value>) -> NodeContext {
    NodeContext::new("node", EventEmitter::detached("node"))
        .with_parameters(params(parameters))
        .with_inputs(inputs)
}

#[tokio::test]
async fn test_set_returns_values_verbatim() {
    let output = SetNode
        .execute(context(json!({"values": {"x": 1}}), vec![]))
        .await
        .unwrap();
    assert_eq!(output, json!({"x": 1}));
}

#[tokio::test]
async fn test_set_requires_a_mapping() {
    for parameters in [json!({}), json!({"values": null}), json!({"values": "x"}), json!({"values": [1]})] {
        let err = SetNode.execute(context(parameters, vec![])).await.unwrap_err();
        assert_eq!(err.to_string(), "Set node requires a values object");
    }
}

#[tokio::test]
async fn test_code_wraps_single_input() {
    let output = CodeNode::new()
        .execute(context(json!({"code": "return items.length"}), vec![json!({"a": 1})]))
        .await
        .unwrap();
    assert_eq!(output, json!(1));
}

#[tokio::test]
async fn test_code_items_shapes() {
    let node = CodeNode::new();
    let code = json!({"code": "return items"});

    let none = node.execute(context(code.clone(), vec![])).await.unwrap();
    assert_eq!(none, json!([]));

    let list = node
        .execute(context(code.clone(), vec![json!([1, 2]), json!({"ignored": true})]))
        .await
        .unwrap();
    assert_eq!(list, json!([1, 2]));
}

#[tokio::test]
async fn test_code_transforms_items() {
    let source = r#"
        const out = [];
        for (const item of items) {
            out.push({ ...item, total: item.price * item.qty });
        }
        return out.filter(i => i.total > 5);
    "#;
    let input = json!([
        {"name": "a", "price": 2, "qty": 2},
        {"name": "b", "price": 3, "qty": 4}
    ]);
    let output = CodeNode::new()
        .execute(context(json!({"code": source}), vec![input]))
        .await
        .unwrap();
    assert_eq!(output, json!([{"name": "b", "price": 3, "qty": 4, "total": 12}]));
}

#[tokio::test]
async fn test_code_without_return_yields_null() {
    let output = CodeNode::new()
        .execute(context(json!({"code": "const x = items.length;"}), vec![]))
        .await
        .unwrap();
    assert_eq!(output, Value::Null);
}

#[tokio::test]
async fn test_code_requires_code_string() {
    let node = CodeNode::new();
    for parameters in [json!({}), json!({"code": ""}), json!({"code": 42})] {
        let err = node.execute(context(parameters, vec![])).await.unwrap_err();
        assert_eq!(err, NodeError::Validation("Code node requires code string".to_string()));
    }
}

#[tokio::test]
async fn test_code_errors_are_wrapped() {
    let node = CodeNode::new();

    let err = node
        .execute(context(json!({"code": "return items[0].name.first"}), vec![]))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Code execution failed: Cannot read properties of null (reading 'name')"
    );

    let err = node
        .execute(context(json!({"code": "return (("}), vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::CodeExecution(_)));
    assert!(err.to_string().starts_with("Code execution failed: "));
}

#[tokio::test]
async fn test_pathological_scripts_fail_cleanly() {
    let node = CodeNode::new();

    let deep = format!("return {}1{};", "[".repeat(10_000), "]".repeat(10_000));
    let err = node
        .execute(context(json!({ "code": deep }), vec![]))
        .await
        .unwrap_err();
    match err {
        NodeError::CodeExecution(message) => {
            assert!(message.starts_with("Expression nested too deeply"), "{}", message)
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let doubling = "let s = 'abcdefgh'; for (const i of Array.from({ length: 34 })) { s = s + s; } return s.length;";
    let err = node
        .execute(context(json!({ "code": doubling }), vec![]))
        .await
        .unwrap_err();
    assert_eq!(err, NodeError::CodeExecution("Invalid string length".to_string()));
}

#[tokio::test]
async fn test_code_runs_are_bounded() {
    let node = CodeNode::with_limits(Limits {
        max_steps: 500,
        ..Limits::default()
    });
    let source = "let n = 0; for (const i of Array.from({ length: 10000 })) { n += 1; } return n";
    let err = node
        .execute(context(json!({"code": source}), vec![]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        NodeError::CodeExecution("Execution step limit of 500 exceeded".to_string())
    );
}

#[test]
fn test_default_registry_has_every_type() {
    let registry = default_registry();
    assert_eq!(registry.list_node_types(), NodeType::ALL.to_vec());
    for node_type in NodeType::ALL {
        let node = registry.get(node_type).unwrap();
        assert_eq!(node.node_type(), node_type);
        let metadata = registry.get_metadata(node_type).unwrap();
        assert!(!metadata.description.is_empty());
    }
}

#[tokio::test]
async fn test_set_then_code_workflow() {
    let runtime = FlowRuntime::with_registry(Arc::new(default_registry()), RuntimeConfig::default());

    let mut wf = Workflow::new();
    wf.add_node(NodeSpec::new("input", NodeType::Set).with_parameter("values", json!({"n": 20})));
    wf.add_node(NodeSpec::new("double", NodeType::Code).with_parameter("code", "return { n: items[0].n * 2 }"));
    wf.add_node(
        NodeSpec::new("label", NodeType::Set)
            .with_parameter("values", json!({"label": "={{ `n is ${$json.n}` }}", "n": "={{ $json.n }}"})),
    );
    wf.connect("input", "double");
    wf.connect("double", "label");

    let result = runtime.execute(&wf).await.unwrap();
    assert!(result.success);
    assert_eq!(result.nodes_executed, 3);
    assert_eq!(result.data, json!({"label": "n is 40", "n": 40}));
}

#[tokio::test]
async fn test_http_url_from_upstream_result() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let n = socket.read(&mut buf).await.unwrap();
        let body = r#"{"status": "healthy"}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).to_string()
    });

    let runtime = FlowRuntime::with_registry(Arc::new(default_registry()), RuntimeConfig::default());
    let mut wf = Workflow::new();
    wf.add_node(
        NodeSpec::new("config", NodeType::Set)
            .with_parameter("values", json!({"endpoint": format!("http://{}/health", addr)})),
    );
    wf.add_node(
        NodeSpec::new("check", NodeType::HttpRequest)
            .with_parameter("url", "={{$json.endpoint}}")
            .with_parameter("method", "GET"),
    );
    wf.connect("config", "check");

    let result = runtime.execute(&wf).await.unwrap();
    assert_eq!(result.data, json!({"status": "healthy"}));

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /health HTTP/1.1"));
}

#[tokio::test]
async fn test_http_validation_failure_aborts_workflow() {
    let runtime = FlowRuntime::with_registry(Arc::new(default_registry()), RuntimeConfig::default());
    let mut wf = Workflow::new();
    wf.add_node(NodeSpec::new("check", NodeType::HttpRequest));
    wf.add_node(NodeSpec::new("after", NodeType::Set).with_parameter("values", json!({})));
    wf.connect("check", "after");

    let err = runtime.execute(&wf).await.unwrap_err();
    assert!(matches!(err, FlowError::Node { ref node_id, .. } if node_id == "check"));
    assert_eq!(
        err.to_string(),
        "Node 'check' failed: HTTP Request node requires a URL"
    );
}
