//! Per-run execution state.

use std::collections::{HashMap, HashSet};

use flowgrid_sandbox::ModuleRegistry;
use serde_json::Value;

use super::result::{NodeResult, NodeStatus};
use crate::debug::{DebugStackFrame, DebugState};
use crate::graph::WorkflowGraph;
use crate::item::ExecutionItem;
use crate::node::{DEFAULT_PORT, Node, NodeId, RoutedItems};
use crate::provider::CredentialsRegistry;

/// Mutable state for one workflow run.
///
/// Outputs and results are written only by the engine's single traversal
/// loop; nodes never observe partially-written state.
#[derive(Debug, Default)]
pub(crate) struct RunContext {
    /// Credentials for this organization.
    pub credentials: CredentialsRegistry,
    /// Sandbox modules (utility nodes plus resolved packages).
    pub modules: ModuleRegistry,
    /// Memoized per-port outputs of executed nodes.
    pub outputs: HashMap<NodeId, HashMap<String, Vec<ExecutionItem>>>,
    /// One result per executed node.
    pub results: HashMap<NodeId, NodeResult>,
    /// Execution order.
    pub executed: Vec<NodeId>,
    /// Debug frames, populated in debug mode.
    pub call_stack: Vec<DebugStackFrame>,
    /// Data the trigger node wraps as its output.
    pub trigger_data: Value,
    executed_set: HashSet<NodeId>,
}

impl RunContext {
    /// Creates a fresh run context.
    pub fn new(credentials: CredentialsRegistry, trigger_data: Value) -> Self {
        Self { credentials, trigger_data, ..Default::default() }
    }

    /// Restores memoized state from a paused debug snapshot.
    pub fn resume(&mut self, state: DebugState) {
        self.executed_set = state.executed.iter().copied().collect();
        self.executed = state.executed;
        self.results = state.node_results;
        self.outputs = state.node_outputs;
        self.call_stack = state.call_stack;
        if let Some(trigger_data) = state.trigger_data {
            self.trigger_data = trigger_data;
        }
    }

    /// Returns a resumable snapshot of the current state.
    pub fn snapshot(&self) -> DebugState {
        DebugState {
            executed: self.executed.clone(),
            last_executed_node_id: self.executed.last().copied(),
            node_results: self.results.clone(),
            node_outputs: self.outputs.clone(),
            call_stack: self.call_stack.clone(),
            trigger_data: Some(self.trigger_data.clone()),
        }
    }

    /// Whether a node already executed in this run.
    pub fn is_executed(&self, id: NodeId) -> bool {
        self.executed_set.contains(&id)
    }

    /// The most recently executed node.
    pub fn last_executed(&self) -> Option<NodeId> {
        self.executed.last().copied()
    }

    /// Records a completed node with its routed outputs.
    pub fn record_success(&mut self, node: &Node, routed: RoutedItems, duration_ms: u64) {
        let output = concat_ports(&routed);
        self.results.insert(node.id, NodeResult {
            node_id: node.id,
            node_label: node.label.clone(),
            status: NodeStatus::Completed,
            output: Some(output),
            error: None,
            duration_ms,
        });
        self.outputs.insert(node.id, routed);
        self.mark_executed(node.id);
    }

    /// Records a failed node; the run halts afterward.
    pub fn record_failure(&mut self, node: &Node, message: String, duration_ms: u64) {
        self.results.insert(node.id, NodeResult {
            node_id: node.id,
            node_label: node.label.clone(),
            status: NodeStatus::Failed,
            output: None,
            error: Some(message),
            duration_ms,
        });
        self.mark_executed(node.id);
    }

    fn mark_executed(&mut self, id: NodeId) {
        if self.executed_set.insert(id) {
            self.executed.push(id);
        }
    }

    /// Gathers a node's input items.
    ///
    /// Trigger nodes receive the trigger data wrapped as one item. Other
    /// nodes receive their predecessors' outputs concatenated in
    /// connection order, following each edge's source port; a predecessor
    /// port with no memoized items contributes nothing.
    pub fn gather_input(&self, graph: &WorkflowGraph, node: &Node) -> Vec<ExecutionItem> {
        if node.is_trigger() {
            return vec![ExecutionItem::from_value(self.trigger_data.clone())];
        }
        self.branch_inputs(graph, node.id).into_iter().flatten().collect()
    }

    /// Gathers a node's input grouped per incoming connection, in
    /// connection order. Used by merge nodes.
    pub fn branch_inputs(&self, graph: &WorkflowGraph, id: NodeId) -> Vec<Vec<ExecutionItem>> {
        graph
            .incoming_edges(id)
            .into_iter()
            .map(|edge| {
                let port = edge.from_port.as_deref().unwrap_or(DEFAULT_PORT);
                self.outputs
                    .get(&edge.from)
                    .and_then(|ports| ports.get(port))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Concatenated output of an executed node across its ports.
    pub fn output_of(&self, id: NodeId) -> Option<Vec<ExecutionItem>> {
        self.outputs.get(&id).map(concat_ports)
    }
}

/// Flattens a routed output map; the default port first, named ports in
/// sorted order for determinism.
fn concat_ports(routed: &RoutedItems) -> Vec<ExecutionItem> {
    let mut out = routed.get(DEFAULT_PORT).cloned().unwrap_or_default();
    let mut named: Vec<_> = routed.iter().filter(|(port, _)| *port != DEFAULT_PORT).collect();
    named.sort_by(|(a, _), (b, _)| a.cmp(b));
    for (_, items) in named {
        out.extend(items.iter().cloned());
    }
    out
}
