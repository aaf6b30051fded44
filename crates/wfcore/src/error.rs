use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Node '{node_id}' failed: {source}")]
    Node {
        node_id: String,
        #[source]
        source: NodeError,
    },

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Execution error: {0}")]
    Execution(String),
}

impl FlowError {
    /// Attach the failing node id to a capability error
    pub fn node(node_id: impl Into<String>, source: NodeError) -> Self {
        FlowError::Node {
            node_id: node_id.into(),
            source,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    /// A required parameter is missing or malformed; raised before any side effect
    #[error("{0}")]
    Validation(String),

    #[error("Invalid parameter '{name}': expected {expected}, got {actual}")]
    InvalidParameter {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("HTTP Request failed: {status} {reason}")]
    Http { status: u16, reason: String },

    #[error("HTTP Request failed: {0}")]
    Transport(String),

    #[error("Code execution failed: {0}")]
    CodeExecution(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Invalid workflow: {0}")]
    Invalid(String),

    #[error("Circular dependency detected in workflow: {}", .nodes.join(", "))]
    CircularDependency { nodes: Vec<String> },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Invalid connection {from} -> {to}: node '{missing}' does not exist")]
    InvalidConnection {
        from: String,
        to: String,
        missing: String,
    },
}
