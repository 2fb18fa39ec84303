//! Limit node: keep the first or last N items.

use serde::{Deserialize, Serialize};

use crate::item::ExecutionItem;

/// Which end of the list to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepMode {
    /// Keep the first N items.
    #[default]
    First,
    /// Keep the last N items.
    Last,
}

/// Configuration for a limit node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Maximum number of items to keep.
    pub count: usize,
    /// Which end of the list to keep.
    #[serde(default)]
    pub keep: KeepMode,
}

impl LimitConfig {
    /// Truncates the item list, preserving order.
    pub fn apply(&self, items: &[ExecutionItem]) -> Vec<ExecutionItem> {
        match self.keep {
            KeepMode::First => items.iter().take(self.count).cloned().collect(),
            KeepMode::Last => {
                let skip = items.len().saturating_sub(self.count);
                items.iter().skip(skip).cloned().collect()
            }
        }
    }
}
