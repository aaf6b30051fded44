//! Core abstractions for the workflow engine
//! 
//! This crate provides the fundamental types and traits that all other
//! components depend on: the workflow document, the node capability
//! contract, the error taxonomy and the execution event bus.

mod error;
pub mod events;
mod node;
mod value;
mod workflow;

pub use error::{FlowError, NodeError, WorkflowError};
pub use node::{Node, NodeContext};
pub use workflow::{Connection, NodeId, NodeSpec, NodeType, Workflow};
pub use value::{Map, Value, ValueExt};
pub use events::*;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
