use wfcore::{Node, NodeType, WorkflowError};
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata about a node type
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub description: String,
    pub category: String,
}

impl NodeMetadata {
    pub fn new(description: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            category: category.into(),
        }
    }
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

struct Registration {
    node: Arc<dyn Node>,
    metadata: NodeMetadata,
}

/// Table of capabilities, one per node type.
///
/// Built explicitly at startup and handed to the runtime; there is no
/// process-wide registry.
pub struct NodeRegistry {
    nodes: HashMap<NodeType, Registration>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Register a capability under the type it reports; replaces any earlier one
    pub fn register(&mut self, node: Arc<dyn Node>, metadata: NodeMetadata) {
        let node_type = node.node_type();
        tracing::debug!("Registering node type: {}", node_type);
        self.nodes.insert(node_type, Registration { node, metadata });
    }

    /// Look up the capability for a node type
    pub fn get(&self, node_type: NodeType) -> Result<Arc<dyn Node>, WorkflowError> {
        self.nodes
            .get(&node_type)
            .map(|r| Arc::clone(&r.node))
            .ok_or_else(|| WorkflowError::UnknownNodeType(node_type.to_string()))
    }

    /// Registered node types, in declaration order of [`NodeType`]
    pub fn list_node_types(&self) -> Vec<NodeType> {
        NodeType::ALL
            .into_iter()
            .filter(|t| self.nodes.contains_key(t))
            .collect()
    }

    pub fn get_metadata(&self, node_type: NodeType) -> Option<&NodeMetadata> {
        self.nodes.get(&node_type).map(|r| &r.metadata)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
