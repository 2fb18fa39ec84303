//! Workflow execution engine.
//!
//! This module provides the runtime for executing workflows:
//! - [`Engine`]: The main execution engine
//! - [`EngineServices`]: Injected collaborators
//! - [`EngineConfig`]: Configuration options
//! - [`WorkflowExecutionResult`] / [`DebugExecutionResult`]: Caller
//!   contracts

mod config;
mod context;
mod executor;
mod result;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use executor::{Engine, EngineServices};
pub use result::{DebugExecutionResult, NodeResult, NodeStatus, WorkflowExecutionResult};
