//! Node types for workflow graphs.
//!
//! Every node carries a tagged [`NodeKind`] with a typed configuration;
//! dispatch in the engine is a match over the tag, not a string compare.
//! External node packages use the opaque [`ExternalConfig`] variant and
//! are resolved through the node-registry collaborator.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

pub mod condition;
pub mod datetime;
pub mod route;
pub mod template;
pub mod transform;

mod code;
mod database;
mod http;
mod id;

pub use code::{CodeConfig, UtilitiesConfig};
pub use condition::{CombineMode, Condition, ConditionOperator};
pub use database::{DataFlavor, DataStatement, DatabaseConfig};
pub use datetime::{DatePart, DateTimeConfig, DateTimeOp, DateUnit};
pub use http::{HttpMethod, HttpRequestConfig};
pub use id::{NodeId, OrganizationId, WorkflowId};
pub use route::{IfConfig, RoutedItems, SwitchCase, SwitchConfig};
pub use transform::{
    AggregateConfig, AggregateMode, CoerceType, CombineBy, EditFieldsConfig, EditOperation,
    FilterConfig, KeepMode, LimitConfig, MergeConfig, MergeMode, RemoveDuplicatesConfig,
    SplitOutConfig, SummarizeConfig, SummarizeOp, SummarizeOperation,
};

/// Output port used by nodes without named branches.
pub const DEFAULT_PORT: &str = "main";

/// Longest duration a wait node may sleep.
pub const MAX_WAIT: Duration = Duration::from_secs(300);

/// Canvas position of a node in the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// Configuration for a wait node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Sleep duration in milliseconds; capped at five minutes.
    pub duration_ms: u64,
}

impl WaitConfig {
    /// Returns the sleep duration, capped at [`MAX_WAIT`].
    pub fn capped_duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms).min(MAX_WAIT)
    }
}

/// Configuration for a throw-error node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowErrorConfig {
    /// Error message the node fails with.
    pub message: String,
    /// Optional error type label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ThrowErrorConfig {
    /// Renders the configured failure message.
    pub fn render(&self) -> String {
        match &self.error_type {
            Some(error_type) => format!("{error_type}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

/// Configuration for a subworkflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubworkflowConfig {
    /// The workflow executed with this node's input as trigger data.
    pub workflow_id: WorkflowId,
}

/// Opaque configuration for an externally-provided node type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalConfig {
    /// Node type name resolved through the node registry.
    pub type_name: String,
    /// Executor-specific configuration blob.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// The kind of work a node performs, with its typed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    /// Entry point; receives external trigger data.
    Trigger,
    /// Entry point fed by the webhook ingress.
    Webhook,
    /// Sandboxed user code.
    Code(CodeConfig),
    /// Keep items matching conditions.
    Filter(FilterConfig),
    /// Keep the first or last N items.
    Limit(LimitConfig),
    /// Drop duplicate items.
    RemoveDuplicates(RemoveDuplicatesConfig),
    /// Expand an array field into items.
    SplitOut(SplitOutConfig),
    /// Collapse items into one collection item.
    Aggregate(AggregateConfig),
    /// Combine inputs from multiple branches.
    Merge(MergeConfig),
    /// Compute statistics over all items.
    Summarize(SummarizeConfig),
    /// Date operations on a per-item field.
    DateTime(DateTimeConfig),
    /// Set/remove/rename payload fields.
    EditFields(EditFieldsConfig),
    /// Per-item HTTP requests.
    HttpRequest(HttpRequestConfig),
    /// Sleep, then pass items through.
    Wait(WaitConfig),
    /// Query a database through an organization credential.
    Database(DatabaseConfig),
    /// Run another workflow with this node's input as trigger data.
    ExecuteWorkflow(SubworkflowConfig),
    /// Route items to true/false ports.
    If(IfConfig),
    /// Route items to the first matching case.
    Switch(SwitchConfig),
    /// Always fail with a configured message.
    ThrowError(ThrowErrorConfig),
    /// Helper module exposed to code nodes.
    Utilities(UtilitiesConfig),
    /// Externally-provided node type.
    External(ExternalConfig),
    /// Pass items through unchanged.
    NoOp,
}

impl NodeKind {
    /// Returns the kind tag as a string.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Whether this kind starts a workflow.
    pub const fn is_trigger(&self) -> bool {
        matches!(self, NodeKind::Trigger | NodeKind::Webhook)
    }
}

/// A typed unit of work in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: NodeId,
    /// Display label; also names the variable exposed to code nodes.
    pub label: String,
    /// Canvas position, if the editor stored one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// The node's kind and configuration.
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Creates a node with a fresh ID.
    pub fn new(label: impl Into<String>, kind: NodeKind) -> Self {
        Self { id: NodeId::new(), label: label.into(), position: None, kind }
    }

    /// Creates a node with a specific ID.
    pub fn with_id(id: NodeId, label: impl Into<String>, kind: NodeKind) -> Self {
        Self { id, label: label.into(), position: None, kind }
    }

    /// Whether this node starts a workflow.
    pub const fn is_trigger(&self) -> bool {
        self.kind.is_trigger()
    }
}
