//! Sandbox configuration.

use std::time::Duration;

/// Configuration for the embedded JavaScript sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Wall-clock budget for a single execution.
    pub timeout: Duration,

    /// Max source length in bytes.
    pub max_code_length: usize,

    /// Max serialized output size in bytes.
    pub max_output_bytes: usize,

    /// Engine-level loop iteration cap; backstop for the wall-clock budget.
    pub loop_iteration_limit: u64,

    /// Engine-level recursion cap.
    pub recursion_limit: usize,

    /// Remove non-allow-listed globals and freeze core prototypes.
    pub freeze_globals: bool,

    /// Globals kept when pruning the context.
    pub allowed_globals: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5_000),
            max_code_length: 1_000_000,
            max_output_bytes: 1024 * 1024,
            loop_iteration_limit: 10_000_000,
            recursion_limit: 512,
            freeze_globals: true,
            allowed_globals: vec![
                "JSON".into(),
                "Math".into(),
                "parseInt".into(),
                "parseFloat".into(),
                "isNaN".into(),
                "isFinite".into(),
                "Number".into(),
                "String".into(),
                "Boolean".into(),
                "Array".into(),
                "Object".into(),
                "Error".into(),
                "TypeError".into(),
                "RangeError".into(),
                "RegExp".into(),
                "Date".into(),
                "Promise".into(),
                "Map".into(),
                "Set".into(),
                "Symbol".into(),
                "encodeURIComponent".into(),
                "decodeURIComponent".into(),
                "encodeURI".into(),
                "decodeURI".into(),
            ],
        }
    }
}
