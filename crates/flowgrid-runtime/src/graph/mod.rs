//! Workflow graph structures.
//!
//! This module provides the graph representation for workflows:
//! - [`WorkflowGraph`]: The main graph structure containing nodes and edges
//! - [`WorkflowDefinition`]: Serializable workflow definition (JSON-friendly)
//! - [`WorkflowMetadata`]: Metadata about the workflow
//! - [`Edge`]: Connections between nodes
//! - [`EdgeData`]: Data stored on edges in the underlying petgraph
//!
//! Reachability queries (predecessor closures, distances) live in the
//! `resolver` submodule as inherent methods on [`WorkflowGraph`].

mod graph;
mod resolver;
pub mod workflow;

pub use graph::WorkflowGraph;
pub use workflow::{Edge, EdgeData, WorkflowDefinition, WorkflowMetadata};
