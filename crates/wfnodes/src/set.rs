use async_trait::async_trait;
use wfcore::{Node, NodeContext, NodeError, NodeType, Value};
use wfruntime::NodeMetadata;

/// Returns its `values` mapping unchanged
pub struct SetNode;

impl SetNode {
    pub fn metadata() -> NodeMetadata {
        NodeMetadata::new("Inject a literal object into the workflow", "data")
    }
}

#[async_trait]
impl Node for SetNode {
    fn node_type(&self) -> NodeType {
        NodeType::Set
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        match ctx.parameter("values") {
            Some(values @ Value::Object(_)) => Ok(values.clone()),
            _ => Err(NodeError::Validation(
                "Set node requires a values object".to_string(),
            )),
        }
    }
}
