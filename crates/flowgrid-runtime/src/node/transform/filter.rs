//! Filter node: keep items matching configured conditions.

use serde::{Deserialize, Serialize};

use crate::error::WorkflowResult;
use crate::item::ExecutionItem;
use crate::node::condition::{CombineMode, Condition, evaluate_conditions};

/// Configuration for a filter node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Conditions evaluated per item.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Whether all or any condition must match.
    #[serde(default)]
    pub combine: CombineMode,
}

impl FilterConfig {
    /// Keeps the items whose conditions evaluate true; pure function of
    /// config and input.
    pub fn apply(&self, items: &[ExecutionItem]) -> WorkflowResult<Vec<ExecutionItem>> {
        let mut kept = Vec::new();
        for item in items {
            if evaluate_conditions(&self.conditions, self.combine, item)? {
                kept.push(item.clone());
            }
        }
        Ok(kept)
    }
}
