use crate::executor::{WorkflowExecutionResult, WorkflowExecutor};
use crate::registry::NodeRegistry;
use crate::resolver::ExpressionResolver;
use std::sync::Arc;
use wfcore::{EventBus, ExecutionEvent, FlowError, Workflow};
use wfexpr::Limits;

/// Main entry point for running workflows
pub struct FlowRuntime {
    registry: Arc<NodeRegistry>,
    executor: WorkflowExecutor,
    event_bus: Arc<EventBus>,
}

impl FlowRuntime {
    /// Runtime with an empty registry and default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), config)
    }

    /// Runtime over a pre-built registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        let resolver = ExpressionResolver::with_limits(config.expression_limits);
        Self {
            registry,
            executor: WorkflowExecutor::with_resolver(resolver),
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Run a workflow to completion
    pub async fn execute(&self, workflow: &Workflow) -> Result<WorkflowExecutionResult, FlowError> {
        self.executor
            .execute(workflow, &self.registry, &self.event_bus)
            .await
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Capacity of the broadcast channel carrying execution events
    pub event_buffer_size: usize,
    /// Bounds applied to every `={{ }}` expression
    pub expression_limits: Limits,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            expression_limits: Limits::default(),
        }
    }
}
