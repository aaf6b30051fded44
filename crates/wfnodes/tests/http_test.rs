// crates/wfnodes/tests/http_test.rs

use serde_json::{json, Map};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use wfcore::{EventBus, EventEmitter, ExecutionEvent, ExecutionId, Node, NodeContext, NodeError, NodeEvent, Value};
use wfnodes::HttpRequestNode;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn http_response(status_line: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        content_type,
        body.len(),
        body
    )
}

/// Accept one connection, answer it with `response` and hand back the raw request
async fn serve_once(response: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });
    (format!("http://{}", addr), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

#[tokio::test]
async fn test_get_returns_parsed_json() {
    init_tracing();
    let (base, server) = serve_once(http_response(
        "200 OK",
        "application/json",
        r#"{"users": [{"name": "Ada"}]}"#,
    ))
    .await;

    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let url = format!("{}/users", base);
    let ctx = NodeContext::new("fetch", bus.create_emitter(ExecutionId::new_v4(), "fetch"))
        .with_parameters(params(json!({ "url": url })));

    let output = HttpRequestNode::new().execute(ctx).await.unwrap();
    assert_eq!(output, json!({"users": [{"name": "Ada"}]}));

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /users HTTP/1.1"), "request was: {}", request);

    let mut messages = Vec::new();
    while let Ok(ExecutionEvent::NodeEvent { event: NodeEvent::Info { message }, .. }) = rx.try_recv() {
        messages.push(message);
    }
    assert_eq!(messages, vec![format!("GET {}", url), "Response status: 200".to_string()]);
}

#[tokio::test]
async fn test_post_sends_json_body_and_headers() {
    let (base, server) = serve_once(http_response("201 Created", "application/json", r#"{"id": 7}"#)).await;

    let ctx = NodeContext::new("create", EventEmitter::detached("create")).with_parameters(params(json!({
        "url": format!("{}/users", base),
        "method": "post",
        "headers": {"X-Api-Key": "secret", "X-Retry": 2},
        "body": {"name": "Ada"}
    })));

    let output = HttpRequestNode::new().execute(ctx).await.unwrap();
    assert_eq!(output, json!({"id": 7}));

    let request = server.await.unwrap();
    let lower = request.to_lowercase();
    assert!(request.starts_with("POST /users HTTP/1.1"));
    assert!(lower.contains("x-api-key: secret"));
    assert!(lower.contains("x-retry: 2"));
    assert!(lower.contains("content-type: application/json"));
    assert!(request.ends_with(r#"{"name":"Ada"}"#));
}

#[tokio::test]
async fn test_string_body_is_sent_verbatim() {
    let (base, server) = serve_once(http_response("200 OK", "text/plain", "ok")).await;

    let ctx = NodeContext::new("put", EventEmitter::detached("put")).with_parameters(params(json!({
        "url": base,
        "method": "PUT",
        "body": "raw text"
    })));

    let output = HttpRequestNode::new().execute(ctx).await.unwrap();
    assert_eq!(output, json!("ok"));

    let request = server.await.unwrap();
    assert!(request.starts_with("PUT / HTTP/1.1"));
    assert!(request.ends_with("raw text"));
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let (base, server) = serve_once(http_response("404 Not Found", "text/plain", "nope")).await;

    let ctx = NodeContext::new("fetch", EventEmitter::detached("fetch"))
        .with_parameters(params(json!({ "url": format!("{}/missing", base) })));

    let err = HttpRequestNode::new().execute(ctx).await.unwrap_err();
    assert_eq!(
        err,
        NodeError::Http {
            status: 404,
            reason: "Not Found".to_string()
        }
    );
    assert_eq!(err.to_string(), "HTTP Request failed: 404 Not Found");
    server.await.unwrap();
}

#[tokio::test]
async fn test_missing_url_fails_before_any_request() {
    let node = HttpRequestNode::new();

    for parameters in [json!({}), json!({"url": null}), json!({"url": ""}), json!({"method": "GET"})] {
        let ctx = NodeContext::new("fetch", EventEmitter::detached("fetch")).with_parameters(params(parameters));
        let err = node.execute(ctx).await.unwrap_err();
        assert_eq!(err, NodeError::Validation("HTTP Request node requires a URL".to_string()));
    }
}

#[tokio::test]
async fn test_malformed_parameters_are_rejected() {
    let node = HttpRequestNode::new();

    let ctx = NodeContext::new("fetch", EventEmitter::detached("fetch"))
        .with_parameters(params(json!({"url": "http://127.0.0.1:9", "headers": ["x"]})));
    let err = node.execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::InvalidParameter { ref name, .. } if name == "headers"));

    let ctx = NodeContext::new("fetch", EventEmitter::detached("fetch"))
        .with_parameters(params(json!({"url": "http://127.0.0.1:9", "method": "NOT A METHOD"})));
    let err = node.execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::InvalidParameter { ref name, .. } if name == "method"));
}

#[tokio::test]
async fn test_connection_failure_is_reported() {
    // grab a free port, then close it again
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ctx = NodeContext::new("fetch", EventEmitter::detached("fetch"))
        .with_parameters(params(json!({ "url": format!("http://{}", addr) })));

    let err = HttpRequestNode::new().execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::Transport(_)), "unexpected error: {:?}", err);
    assert!(err.to_string().starts_with("HTTP Request failed:"));
}
