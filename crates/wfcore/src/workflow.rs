use crate::{Map, Value, WorkflowError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub type NodeId = String;

/// Complete workflow definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeSpec) -> NodeId {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub fn connect(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) {
        self.connections.push(Connection {
            from: from.into(),
            to: to.into(),
        });
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Connections feeding `id`, in document order
    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.to == id)
    }

    /// Structural checks normally done before a workflow reaches the engine:
    /// at least one node, and every node id non-empty and unique.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.nodes.is_empty() {
            return Err(WorkflowError::Invalid(
                "workflow must contain at least one node".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(WorkflowError::Invalid("node id must not be empty".to_string()));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(WorkflowError::Invalid(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
        }

        Ok(())
    }
}

/// Node specification in a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl NodeSpec {
    pub fn new(id: impl Into<NodeId>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            node_type,
            parameters: Map::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// The closed set of node types a workflow may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    HttpRequest,
    Set,
    Code,
}

impl NodeType {
    pub const ALL: [NodeType; 3] = [NodeType::HttpRequest, NodeType::Set, NodeType::Code];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::HttpRequest => "httpRequest",
            NodeType::Set => "set",
            NodeType::Code => "code",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection between nodes: the output of `from` is an input of `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
}
