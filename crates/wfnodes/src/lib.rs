//! Standard node library
//!
//! The three built-in capabilities: `httpRequest`, `set` and `code`.

mod code;
mod http;
mod set;

pub use code::CodeNode;
pub use http::HttpRequestNode;
pub use set::SetNode;
use wfruntime::NodeRegistry;

use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(HttpRequestNode::new()), HttpRequestNode::metadata());
    registry.register(Arc::new(SetNode), SetNode::metadata());
    registry.register(Arc::new(CodeNode::new()), CodeNode::metadata());
}

/// A registry holding every standard node
pub fn default_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry);
    registry
}
