use async_trait::async_trait;
use wfcore::{Node, NodeContext, NodeError, NodeType, Value};
use wfexpr::{Limits, Script};
use wfruntime::NodeMetadata;

/// Runs a user-supplied function body with `items` bound to the node's input
///
/// The body is interpreted by `wfexpr`, never compiled or given host access,
/// and every run is bounded by [`Limits`].
pub struct CodeNode {
    limits: Limits,
}

impl CodeNode {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn metadata() -> NodeMetadata {
        NodeMetadata::new("Transform items with a script", "transform")
    }
}

impl Default for CodeNode {
    fn default() -> Self {
        Self::new()
    }
}

/// `items` as seen by the script: the first input, wrapped in a list unless
/// it already is one; empty without inputs
fn items_from(inputs: &[Value]) -> Value {
    match inputs.first() {
        None => Value::Array(Vec::new()),
        Some(list @ Value::Array(_)) => list.clone(),
        Some(single) => Value::Array(vec![single.clone()]),
    }
}

#[async_trait]
impl Node for CodeNode {
    fn node_type(&self) -> NodeType {
        NodeType::Code
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let code = match ctx.parameter("code") {
            Some(Value::String(code)) if !code.is_empty() => code.clone(),
            _ => {
                return Err(NodeError::Validation(
                    "Code node requires code string".to_string(),
                ))
            }
        };
        let items = items_from(&ctx.inputs);
        let limits = self.limits;

        tracing::debug!(node_id = %ctx.node_id, bytes = code.len(), "Running code node script");

        // the interpreter is CPU-bound; keep it off the async workers
        let outcome = tokio::task::spawn_blocking(move || {
            Script::parse(&code)
                .and_then(|script| script.run_with_limits([("items", items)], limits))
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| NodeError::ExecutionFailed(format!("Script task failed: {}", e)))?;

        outcome.map_err(|message| {
            ctx.events.warn(format!("Script error: {}", message));
            NodeError::CodeExecution(message)
        })
    }
}
