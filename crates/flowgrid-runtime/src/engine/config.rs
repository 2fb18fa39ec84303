//! Engine configuration.

use std::time::Duration;

use derive_builder::Builder;

/// Configuration for the workflow execution engine.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Maximum number of concurrent workflow executions.
    #[builder(default = "10")]
    pub max_concurrent_runs: usize,

    /// Default wall-clock budget for a code node.
    #[builder(default = "Duration::from_millis(5_000)")]
    pub code_timeout: Duration,

    /// Maximum nesting depth for subworkflow calls.
    #[builder(default = "10")]
    pub max_subworkflow_depth: usize,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_concurrent_runs {
            if max == 0 {
                return Err("max_concurrent_runs must be at least 1".into());
            }
        }
        if let Some(depth) = self.max_subworkflow_depth {
            if depth == 0 {
                return Err("max_subworkflow_depth must be at least 1".into());
            }
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 10,
            code_timeout: Duration::from_millis(5_000),
            max_subworkflow_depth: 10,
        }
    }
}
