//! Workflow execution runtime
//!
//! This crate provides the engine that runs workflows: expression and
//! parameter resolution, the node registry, Kahn scheduling and the
//! sequential executor.

mod executor;
mod registry;
mod resolver;
mod runtime;

pub use executor::{WorkflowExecutionResult, WorkflowExecutor};
pub use registry::{NodeMetadata, NodeRegistry};
pub use resolver::ExpressionResolver;
pub use runtime::{FlowRuntime, RuntimeConfig};
