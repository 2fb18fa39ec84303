//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use flowgrid_runtime::prelude::*;
//! ```

pub use crate::debug::{DebugOptions, DebugStackFrame, DebugState, SourceLocation};
pub use crate::engine::{
    DebugExecutionResult, Engine, EngineConfig, EngineServices, NodeResult, NodeStatus,
    WorkflowExecutionResult,
};
pub use crate::error::{WorkflowError, WorkflowResult};
pub use crate::graph::{Edge, WorkflowDefinition, WorkflowGraph, WorkflowMetadata};
pub use crate::item::{ExecutionItem, PairedItem};
pub use crate::node::{Node, NodeId, NodeKind, OrganizationId, WorkflowId};
pub use crate::provider::{
    CredentialsRegistry, CredentialsService, DataConnector, ExternalNodeExecutor,
    InMemoryWorkflowStore, NodeRegistry, PackageProvider, StaticCredentials, WorkflowStore,
};
