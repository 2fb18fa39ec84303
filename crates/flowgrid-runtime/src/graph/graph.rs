//! Workflow graph runtime representation.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::workflow::{Edge, EdgeData, WorkflowDefinition, WorkflowMetadata};
use crate::error::{WorkflowError, WorkflowResult};
use crate::node::{Node, NodeId};

/// A workflow graph containing nodes and edges.
///
/// Internally uses petgraph's `DiGraph` for efficient graph operations.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    /// The underlying directed graph.
    graph: DiGraph<Node, EdgeData>,
    /// Mapping from NodeId to petgraph's NodeIndex.
    node_indices: HashMap<NodeId, NodeIndex>,
    /// Reverse mapping from NodeIndex to NodeId.
    index_to_id: HashMap<NodeIndex, NodeId>,
    /// Workflow metadata.
    pub metadata: WorkflowMetadata,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new workflow graph with metadata.
    pub fn with_metadata(metadata: WorkflowMetadata) -> Self {
        Self { metadata, ..Default::default() }
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Adds a node to the graph and returns its ID.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        self.index_to_id.insert(index, id);
        id
    }

    /// Returns a reference to a node.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        let index = self.node_indices.get(&id)?;
        self.graph.node_weight(*index)
    }

    /// Returns whether a node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_indices.contains_key(&id)
    }

    /// Returns an iterator over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().filter_map(|index| self.graph.node_weight(index))
    }

    /// Returns an iterator over all node IDs in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph
            .node_indices()
            .filter_map(|index| self.index_to_id.get(&index).copied())
    }

    /// Adds an edge between two nodes.
    pub fn add_edge(&mut self, edge: Edge) -> WorkflowResult<()> {
        let from_index = self.node_indices.get(&edge.from).ok_or_else(|| {
            WorkflowError::InvalidDefinition(format!("source node {} does not exist", edge.from))
        })?;
        let to_index = self.node_indices.get(&edge.to).ok_or_else(|| {
            WorkflowError::InvalidDefinition(format!("target node {} does not exist", edge.to))
        })?;

        let edge_data = EdgeData { from_port: edge.from_port, to_port: edge.to_port };
        self.graph.add_edge(*from_index, *to_index, edge_data);
        Ok(())
    }

    /// Connects two nodes with a default-port edge.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> WorkflowResult<()> {
        self.add_edge(Edge::new(from, to))
    }

    /// Returns an iterator over all edges.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edge_references().filter_map(|edge_ref| {
            let from = *self.index_to_id.get(&edge_ref.source())?;
            let to = *self.index_to_id.get(&edge_ref.target())?;
            let data = edge_ref.weight();
            Some(Edge {
                from,
                to,
                from_port: data.from_port.clone(),
                to_port: data.to_port.clone(),
            })
        })
    }

    /// Returns edges originating from a node.
    pub fn outgoing_edges(&self, id: NodeId) -> Vec<Edge> {
        self.directed_edges(id, Direction::Outgoing)
    }

    /// Returns edges targeting a node.
    pub fn incoming_edges(&self, id: NodeId) -> Vec<Edge> {
        self.directed_edges(id, Direction::Incoming)
    }

    fn directed_edges(&self, id: NodeId, direction: Direction) -> Vec<Edge> {
        let Some(index) = self.node_indices.get(&id).copied() else {
            return Vec::new();
        };
        let mut edges: Vec<Edge> = self
            .graph
            .edges_directed(index, direction)
            .filter_map(|edge_ref| {
                let from = *self.index_to_id.get(&edge_ref.source())?;
                let to = *self.index_to_id.get(&edge_ref.target())?;
                let data = edge_ref.weight();
                Some(Edge {
                    from,
                    to,
                    from_port: data.from_port.clone(),
                    to_port: data.to_port.clone(),
                })
            })
            .collect();
        // petgraph iterates edges most-recent-first; callers expect
        // connection order.
        edges.reverse();
        edges
    }

    /// Returns the first trigger node in insertion order.
    pub fn trigger_node(&self) -> WorkflowResult<NodeId> {
        self.graph
            .node_indices()
            .filter_map(|index| {
                let node = self.graph.node_weight(index)?;
                node.is_trigger().then_some(node.id)
            })
            .next()
            .ok_or(WorkflowError::MissingTrigger)
    }

    /// Validates the workflow graph structure.
    ///
    /// Checks that the graph is non-empty, has a trigger node, and is
    /// acyclic. A cyclic connection graph fails here, before any node
    /// executes.
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.graph.node_count() == 0 {
            return Err(WorkflowError::InvalidDefinition(
                "workflow must have at least one node".into(),
            ));
        }

        self.trigger_node()?;

        if toposort(&self.graph, None).is_err() {
            return Err(WorkflowError::CyclicGraph);
        }

        Ok(())
    }

    /// Returns nodes in topological order.
    pub fn topological_order(&self) -> WorkflowResult<Vec<NodeId>> {
        toposort(&self.graph, None)
            .map(|indices| {
                indices
                    .into_iter()
                    .filter_map(|index| self.index_to_id.get(&index).copied())
                    .collect()
            })
            .map_err(|_| WorkflowError::CyclicGraph)
    }

    /// Converts the workflow graph to a serializable definition.
    pub fn to_definition(&self) -> WorkflowDefinition {
        WorkflowDefinition {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Creates a workflow graph from a definition.
    ///
    /// Returns an error if any edge references a non-existent node.
    pub fn from_definition(definition: WorkflowDefinition) -> WorkflowResult<Self> {
        let mut graph = Self::with_metadata(definition.metadata);

        for node in definition.nodes {
            graph.add_node(node);
        }
        for edge in definition.edges {
            graph.add_edge(edge)?;
        }

        Ok(graph)
    }
}
