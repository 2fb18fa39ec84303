//! Code and utilities node configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a user-code node.
///
/// The source runs inside the embedded sandbox with predecessor outputs
/// bound as named variables; the returned value is normalized into the
/// item-list contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeConfig {
    /// User source; `import` lines and a top-level `return` are allowed.
    pub source: String,
    /// Per-node budget override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl CodeConfig {
    /// Returns the configured per-node budget.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Configuration for a utilities node.
///
/// Utilities nodes are compiled before the run starts and exposed to every
/// code node as a module (by sanitized label) through `require` and a
/// same-named global.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilitiesConfig {
    /// CommonJS-style module source assigning to `exports`.
    pub source: String,
}
