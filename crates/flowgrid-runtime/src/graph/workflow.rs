//! Serializable workflow definition types.

use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeId};

/// A connection between two nodes.
///
/// `from_port` selects a conditional branch on the source node; absent
/// means the default output. Fan-in concatenates inputs in edge order,
/// fan-out broadcasts the same output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
    /// Source output port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_port: Option<String>,
    /// Target input port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_port: Option<String>,
}

impl Edge {
    /// Creates an edge on the default ports.
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to, from_port: None, to_port: None }
    }

    /// Sets the source output port.
    pub fn from_port(mut self, port: impl Into<String>) -> Self {
        self.from_port = Some(port.into());
        self
    }
}

/// Data stored on edges in the underlying petgraph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Source output port.
    pub from_port: Option<String>,
    /// Target input port.
    pub to_port: Option<String>,
}

/// Workflow metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Ambient type declarations the editor stores for code nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_definitions: Option<String>,
}

/// Serializable workflow definition (JSON-friendly).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow nodes.
    pub nodes: Vec<Node>,
    /// Connections between nodes.
    pub edges: Vec<Edge>,
    /// Workflow metadata.
    #[serde(default)]
    pub metadata: WorkflowMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn edge_builder_sets_port() {
        let a = NodeId::new();
        let b = NodeId::new();
        let edge = Edge::new(a, b).from_port("true");
        assert_eq!(edge.from_port.as_deref(), Some("true"));
        assert_eq!(edge.to_port, None);
    }

    #[test]
    fn definition_round_trips() {
        let trigger = Node::new("Start", NodeKind::Trigger);
        let noop = Node::new("End", NodeKind::NoOp);
        let definition = WorkflowDefinition {
            edges: vec![Edge::new(trigger.id, noop.id)],
            nodes: vec![trigger, noop],
            metadata: WorkflowMetadata { name: "demo".into(), type_definitions: None },
        };
        let text = serde_json::to_string(&definition).unwrap();
        let parsed: WorkflowDefinition = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, definition);
    }
}
