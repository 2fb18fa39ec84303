//! Workflow error types.

use thiserror::Error;

use crate::node::NodeId;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Workflow does not exist for the organization.
    #[error("workflow not found")]
    WorkflowNotFound,

    /// The graph has no trigger node to start from.
    #[error("workflow has no trigger node")]
    MissingTrigger,

    /// The connection graph contains a cycle.
    #[error("cycle detected in workflow graph")]
    CyclicGraph,

    /// Workflow definition is invalid.
    #[error("invalid workflow definition: {0}")]
    InvalidDefinition(String),

    /// Node configuration is invalid.
    #[error("invalid config for node {node_id}: {message}")]
    InvalidNodeConfig {
        /// ID of the node with invalid config.
        node_id: NodeId,
        /// Error message.
        message: String,
    },

    /// Node execution failed.
    #[error("node {node_id} failed: {message}")]
    NodeFailed {
        /// ID of the failed node.
        node_id: NodeId,
        /// Error message.
        message: String,
    },

    /// A referenced credential is not registered for the organization.
    #[error("credentials '{0}' not found")]
    CredentialsNotFound(String),

    /// Sandboxed code failed to compile or execute.
    #[error("sandbox error: {0}")]
    Sandbox(#[from] flowgrid_sandbox::SandboxError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Workflow execution was cancelled.
    #[error("workflow execution cancelled")]
    Cancelled,

    /// Workflow execution timed out.
    #[error("workflow execution timed out")]
    Timeout,

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}
