//! Breakpoint-debug state types.
//!
//! The engine is stateless between debug step calls: when a run pauses it
//! returns a [`DebugState`] snapshot, and the caller passes it back via
//! [`DebugOptions::previous_state`] to resume. One snapshot corresponds to
//! one debug session.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::NodeResult;
use crate::item::ExecutionItem;
use crate::node::NodeId;

/// A best-effort source position extracted from a code-node error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

/// Extracts a source location from an error message.
///
/// Positions come from the interpreter's error text; they are not
/// guaranteed to survive the sandbox wrapper exactly, so callers treat
/// this as a hint.
pub fn source_location_from_error(message: &str) -> Option<SourceLocation> {
    flowgrid_sandbox::source_position(message)
        .map(|(line, column)| SourceLocation { line, column })
}

/// One executed node in a debug run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugStackFrame {
    /// Node that executed.
    pub node_id: NodeId,
    /// Node label at execution time.
    pub node_label: String,
    /// Node kind tag.
    pub node_kind: String,
    /// When the node executed.
    pub timestamp: jiff::Timestamp,
    /// Input items, when captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<ExecutionItem>>,
    /// Output items, when the node completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<ExecutionItem>>,
    /// Error message, when the node failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Best-effort source position for code-node failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

/// Options for one debug-execution call.
#[derive(Debug, Clone, Default)]
pub struct DebugOptions {
    /// Nodes the run pauses before executing.
    pub breakpoints: HashSet<NodeId>,
    /// Pause after executing this node (single-step); while set,
    /// breakpoints do not pause.
    pub stop_at_node: Option<NodeId>,
    /// Capture source locations for code-node failures.
    pub capture_stack_traces: bool,
    /// Snapshot from a previous paused call to resume from.
    pub previous_state: Option<DebugState>,
}

/// Resumable snapshot of a paused debug run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugState {
    /// Node IDs executed so far, in execution order.
    pub executed: Vec<NodeId>,
    /// The most recently executed node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_executed_node_id: Option<NodeId>,
    /// Results recorded so far.
    pub node_results: HashMap<NodeId, NodeResult>,
    /// Memoized per-port outputs of executed nodes.
    pub node_outputs: HashMap<NodeId, HashMap<String, Vec<ExecutionItem>>>,
    /// Stack frames recorded so far.
    pub call_stack: Vec<DebugStackFrame>,
    /// Trigger data the run started with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_data: Option<Value>,
}
