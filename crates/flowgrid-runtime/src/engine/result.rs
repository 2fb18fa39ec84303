//! Execution result types returned to callers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::debug::{DebugStackFrame, DebugState};
use crate::item::ExecutionItem;
use crate::node::NodeId;

/// Lifecycle status of one node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeStatus {
    /// Not yet dispatched.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error; the run halts.
    Failed,
}

/// Result of one executed node; immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    /// The node this result belongs to.
    pub node_id: NodeId,
    /// Node label at execution time.
    pub node_label: String,
    /// Final status.
    pub status: NodeStatus,
    /// Output items, present on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<ExecutionItem>>,
    /// Error message, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock execution time in milliseconds.
    pub duration_ms: u64,
}

/// Result of a full or targeted workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowExecutionResult {
    /// Whether every executed node completed.
    pub success: bool,
    /// One result per executed node, keyed by node ID.
    pub node_results: HashMap<NodeId, NodeResult>,
    /// Output of the run's final node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Vec<ExecutionItem>>,
    /// Error message when the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a debug-execution call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugExecutionResult {
    /// Whether every executed node completed so far.
    pub success: bool,
    /// One result per executed node, keyed by node ID.
    pub node_results: HashMap<NodeId, NodeResult>,
    /// Output of the most recently executed node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Vec<ExecutionItem>>,
    /// Error message when the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the run paused instead of finishing.
    pub is_paused: bool,
    /// The node the run paused at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at_node_id: Option<NodeId>,
    /// Direct successors of the paused node that have not executed yet.
    #[serde(default)]
    pub next_node_ids: Vec<NodeId>,
    /// Frames for every node executed by this call chain.
    #[serde(default)]
    pub call_stack: Vec<DebugStackFrame>,
    /// Snapshot to pass back as `previous_state` to resume; present while
    /// paused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<DebugState>,
}
