use crate::{events::EventEmitter, Map, NodeError, NodeId, NodeType, Value, ValueExt};
use async_trait::async_trait;

/// Core trait that all executable nodes implement
#[async_trait]
pub trait Node: Send + Sync {
    /// The workflow node type this capability serves
    fn node_type(&self) -> NodeType;

    /// Execute the node with its resolved parameters and ordered inputs
    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError>;
}

/// Execution context passed to each node
#[derive(Clone)]
pub struct NodeContext {
    /// Id of the node in the workflow document
    pub node_id: NodeId,

    /// Parameters with every expression already resolved
    pub parameters: Map<String, Value>,

    /// Results of the predecessor nodes, in connection order
    pub inputs: Vec<Value>,

    /// Event emitter for real-time updates
    pub events: EventEmitter,
}

impl NodeContext {
    pub fn new(node_id: impl Into<NodeId>, events: EventEmitter) -> Self {
        Self {
            node_id: node_id.into(),
            parameters: Map::new(),
            inputs: Vec::new(),
            events,
        }
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<Value>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Parameter value, treating `null` as absent
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name).filter(|v| v.is_present())
    }
}
