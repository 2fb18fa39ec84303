#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod error;
mod imports;
mod modules;
mod runner;

pub use config::SandboxConfig;
pub use error::{Diagnostic, SandboxError, SandboxResult, source_position};
pub use imports::{RewrittenCode, rewrite_imports};
pub use modules::{ModuleRegistry, SandboxModule, sanitize_identifier};
pub use runner::{CodeRunner, SandboxOutcome, SandboxRequest};

/// Tracing target for sandbox operations.
pub const TRACING_TARGET: &str = "flowgrid_sandbox";
