use async_trait::async_trait;
use reqwest::Method;
use wfcore::{Node, NodeContext, NodeError, NodeType, Value, ValueExt};
use wfruntime::NodeMetadata;

const MISSING_URL: &str = "HTTP Request node requires a URL";

/// HTTP request node
///
/// Parameters: `url` (required), `method` (default `GET`), `headers`
/// (mapping, default empty) and `body`. String bodies are sent as is, any
/// other body as JSON. Returns the response payload, parsed as JSON when
/// possible and as text otherwise.
pub struct HttpRequestNode {
    client: reqwest::Client,
}

impl HttpRequestNode {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Use a preconfigured client (timeouts, proxies, default headers)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn metadata() -> NodeMetadata {
        NodeMetadata::new("Make HTTP requests", "http")
    }
}

impl Default for HttpRequestNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Request parts checked before anything goes on the wire
struct RequestSpec<'a> {
    url: &'a str,
    method: Method,
    headers: Vec<(&'a str, String)>,
    body: Option<&'a Value>,
}

impl<'a> RequestSpec<'a> {
    fn from_context(ctx: &'a NodeContext) -> Result<Self, NodeError> {
        let url = match ctx.parameter("url") {
            Some(Value::String(url)) if !url.is_empty() => url.as_str(),
            Some(Value::String(_)) | None => return Err(NodeError::Validation(MISSING_URL.to_string())),
            Some(other) => {
                return Err(NodeError::InvalidParameter {
                    name: "url".to_string(),
                    expected: "string".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };

        let method = match ctx.parameter("method") {
            None => Method::GET,
            Some(Value::String(m)) => Method::from_bytes(m.to_uppercase().as_bytes()).map_err(|_| {
                NodeError::InvalidParameter {
                    name: "method".to_string(),
                    expected: "HTTP method".to_string(),
                    actual: m.clone(),
                }
            })?,
            Some(other) => {
                return Err(NodeError::InvalidParameter {
                    name: "method".to_string(),
                    expected: "string".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };

        let headers = match ctx.parameter("headers") {
            None => Vec::new(),
            Some(Value::Object(map)) => map
                .iter()
                .filter(|(_, v)| v.is_present())
                .map(|(k, v)| {
                    let text = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.as_str(), text)
                })
                .collect(),
            Some(other) => {
                return Err(NodeError::InvalidParameter {
                    name: "headers".to_string(),
                    expected: "object".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };

        Ok(Self {
            url,
            method,
            headers,
            body: ctx.parameter("body"),
        })
    }
}

#[async_trait]
impl Node for HttpRequestNode {
    fn node_type(&self) -> NodeType {
        NodeType::HttpRequest
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let spec = RequestSpec::from_context(&ctx)?;

        ctx.events.info(format!("{} {}", spec.method, spec.url));
        tracing::debug!(method = %spec.method, url = spec.url, "Sending HTTP request");

        let mut request = self.client.request(spec.method.clone(), spec.url);
        for (name, value) in &spec.headers {
            request = request.header(*name, value.as_str());
        }
        request = match spec.body {
            None => request,
            Some(Value::String(text)) => request.body(text.clone()),
            Some(json) => request.json(json),
        };

        let response = request
            .send()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        let status = response.status();
        ctx.events.info(format!("Response status: {}", status.as_u16()));

        if !status.is_success() {
            return Err(NodeError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| NodeError::Transport(format!("Failed to read response: {}", e)))?;

        Ok(serde_json::from_str(&body_text).unwrap_or(Value::String(body_text)))
    }
}
