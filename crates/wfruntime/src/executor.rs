use crate::registry::NodeRegistry;
use crate::resolver::ExpressionResolver;
use chrono::Utc;
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;
use wfcore::{
    EventBus, ExecutionEvent, ExecutionId, FlowError, Map, NodeContext, NodeId, Value, Workflow,
    WorkflowError,
};

/// Runs workflows one node at a time in topological order
#[derive(Debug, Clone, Default)]
pub struct WorkflowExecutor {
    resolver: ExpressionResolver,
}

impl WorkflowExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: ExpressionResolver) -> Self {
        Self { resolver }
    }

    /// Compute the execution order with Kahn's algorithm.
    ///
    /// The queue is seeded with the in-degree zero nodes in document order
    /// and successors are enqueued in connection order, so the result is
    /// deterministic for a given document.
    pub fn execution_order(workflow: &Workflow) -> Result<Vec<NodeId>, WorkflowError> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for node in &workflow.nodes {
            in_degree.entry(node.id.as_str()).or_insert(0);
        }

        for conn in &workflow.connections {
            for endpoint in [&conn.from, &conn.to] {
                if !in_degree.contains_key(endpoint.as_str()) {
                    return Err(WorkflowError::InvalidConnection {
                        from: conn.from.clone(),
                        to: conn.to.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
            adjacency
                .entry(conn.from.as_str())
                .or_default()
                .push(conn.to.as_str());
            *in_degree.entry(conn.to.as_str()).or_insert(0) += 1;
        }

        let mut seeded = HashSet::new();
        let mut queue: VecDeque<&str> = workflow
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| in_degree.get(id) == Some(&0) && seeded.insert(*id))
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            for &next in adjacency.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if order.len() < in_degree.len() {
            let nodes = cycle_members(workflow, &order);
            tracing::debug!("Unordered nodes form cycles: {:?}", nodes);
            return Err(WorkflowError::CircularDependency { nodes });
        }

        Ok(order)
    }

    /// Execute a workflow and return the last node's result
    pub async fn execute(
        &self,
        workflow: &Workflow,
        registry: &NodeRegistry,
        event_bus: &EventBus,
    ) -> Result<WorkflowExecutionResult, FlowError> {
        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();

        event_bus.emit(ExecutionEvent::WorkflowStarted {
            execution_id,
            node_count: workflow.nodes.len(),
            timestamp: Utc::now(),
        });

        tracing::info!(
            %execution_id,
            nodes = workflow.nodes.len(),
            connections = workflow.connections.len(),
            "Starting workflow execution"
        );

        let outcome = self
            .run_nodes(workflow, registry, event_bus, execution_id)
            .await;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let nodes_executed = outcome.as_ref().map(|run| run.order.len()).unwrap_or(0);

        event_bus.emit(ExecutionEvent::WorkflowCompleted {
            execution_id,
            success: outcome.is_ok(),
            nodes_executed,
            duration_ms,
            timestamp: Utc::now(),
        });

        match outcome {
            Ok(run) => {
                tracing::info!(
                    %execution_id,
                    nodes_executed,
                    duration_ms,
                    "Workflow execution completed"
                );
                Ok(WorkflowExecutionResult {
                    success: true,
                    data: run.last,
                    execution_time: duration_ms,
                    nodes_executed,
                    execution_id,
                    results: run.results,
                    order: run.order,
                })
            }
            Err(e) => {
                tracing::error!(%execution_id, duration_ms, "Workflow execution failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_nodes(
        &self,
        workflow: &Workflow,
        registry: &NodeRegistry,
        event_bus: &EventBus,
        execution_id: ExecutionId,
    ) -> Result<CompletedRun, FlowError> {
        let order = Self::execution_order(workflow)?;
        let mut results: HashMap<NodeId, Value> = HashMap::with_capacity(order.len());
        let mut last = Value::Null;

        for node_id in &order {
            let spec = workflow
                .find_node(node_id)
                .ok_or_else(|| WorkflowError::NodeNotFound(node_id.clone()))?;

            let inputs = workflow
                .incoming(node_id)
                .map(|conn| {
                    results
                        .get(&conn.from)
                        .cloned()
                        .ok_or_else(|| WorkflowError::NodeNotFound(conn.from.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            // only the first input is visible to expressions
            let context = inputs
                .first()
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            let parameters = self.resolver.resolve_parameters(&spec.parameters, &context);

            let node = registry.get(spec.node_type)?;

            event_bus.emit(ExecutionEvent::NodeStarted {
                execution_id,
                node_id: node_id.clone(),
                node_type: spec.node_type,
                timestamp: Utc::now(),
            });
            tracing::debug!(
                node_id = %node_id,
                node_type = %spec.node_type,
                inputs = inputs.len(),
                "Dispatching node"
            );

            let ctx = NodeContext::new(node_id.clone(), event_bus.create_emitter(execution_id, node_id.clone()))
                .with_parameters(parameters)
                .with_inputs(inputs);

            let started = Instant::now();
            let outcome = node.execute(ctx).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(output) => {
                    tracing::info!("Node {} completed in {}ms", node_id, duration_ms);
                    event_bus.emit(ExecutionEvent::NodeCompleted {
                        execution_id,
                        node_id: node_id.clone(),
                        output: output.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    results.insert(node_id.clone(), output.clone());
                    last = output;
                }
                Err(e) => {
                    tracing::error!("Node {} failed: {}", node_id, e);
                    event_bus.emit(ExecutionEvent::NodeFailed {
                        execution_id,
                        node_id: node_id.clone(),
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(FlowError::node(node_id.clone(), e));
                }
            }
        }

        Ok(CompletedRun {
            results,
            order,
            last,
        })
    }
}

struct CompletedRun {
    results: HashMap<NodeId, Value>,
    order: Vec<NodeId>,
    last: Value,
}

/// Ids of the nodes that sit on a cycle, in document order.
///
/// Nodes that are merely downstream of a cycle are left out.
fn cycle_members(workflow: &Workflow, ordered: &[NodeId]) -> Vec<String> {
    let ordered: HashSet<&str> = ordered.iter().map(String::as_str).collect();

    let mut graph = DiGraph::<&str, ()>::new();
    let mut indices = HashMap::new();
    for node in &workflow.nodes {
        if !ordered.contains(node.id.as_str()) && !indices.contains_key(node.id.as_str()) {
            indices.insert(node.id.as_str(), graph.add_node(node.id.as_str()));
        }
    }
    for conn in &workflow.connections {
        if let (Some(&a), Some(&b)) = (indices.get(conn.from.as_str()), indices.get(conn.to.as_str())) {
            graph.add_edge(a, b, ());
        }
    }

    let on_cycle: HashSet<&str> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || scc.iter().any(|&n| graph.contains_edge(n, n)))
        .flatten()
        .map(|n| graph[n])
        .collect();

    let mut seen = HashSet::new();
    workflow
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| on_cycle.contains(id) && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecutionResult {
    pub success: bool,
    /// Result of the last node in execution order
    pub data: Value,
    /// Wall-clock duration in milliseconds
    pub execution_time: u64,
    pub nodes_executed: usize,
    pub execution_id: ExecutionId,
    /// Every node's result, keyed by node id
    #[serde(skip)]
    pub results: HashMap<NodeId, Value>,
    /// Node ids in the order they ran
    #[serde(skip)]
    pub order: Vec<NodeId>,
}

impl WorkflowExecutionResult {
    pub fn result_of(&self, node_id: &str) -> Option<&Value> {
        self.results.get(node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfcore::{NodeSpec, NodeType};

    fn workflow(ids: &[&str], edges: &[(&str, &str)]) -> Workflow {
        let mut wf = Workflow::new();
        for id in ids {
            wf.add_node(NodeSpec::new(*id, NodeType::Set));
        }
        for (from, to) in edges {
            wf.connect(*from, *to);
        }
        wf
    }

    #[test]
    fn test_order_follows_document_and_connection_order() {
        let wf = workflow(&["a", "b", "c", "d"], &[("a", "d"), ("a", "c"), ("b", "c")]);
        let order = WorkflowExecutor::execution_order(&wf).unwrap();
        assert_eq!(order, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_cycle_members_exclude_downstream_nodes() {
        let wf = workflow(
            &["start", "x", "y", "after"],
            &[("start", "x"), ("x", "y"), ("y", "x"), ("y", "after")],
        );
        let err = WorkflowExecutor::execution_order(&wf).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::CircularDependency {
                nodes: vec!["x".to_string(), "y".to_string()]
            }
        );
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let wf = workflow(&["a"], &[("a", "a")]);
        let err = WorkflowExecutor::execution_order(&wf).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::CircularDependency {
                nodes: vec!["a".to_string()]
            }
        );
    }
}
