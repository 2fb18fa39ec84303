//! Aggregate node: collapse all items into a single item.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::ExecutionItem;

fn default_output_field() -> String {
    "data".into()
}

/// What the aggregate collects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregateMode {
    /// Collect one field's values into an array.
    Field {
        /// Dot path of the field to collect.
        field: String,
    },
    /// Collect whole item payloads into an array.
    Items,
}

/// Configuration for an aggregate node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Collection mode.
    pub mode: AggregateMode,
    /// Field the collected array is written to.
    #[serde(default = "default_output_field")]
    pub output_field: String,
}

impl AggregateConfig {
    /// Collapses the input into one item holding the collected array.
    pub fn apply(&self, items: &[ExecutionItem]) -> Vec<ExecutionItem> {
        let collected: Vec<Value> = match &self.mode {
            AggregateMode::Field { field } => items
                .iter()
                .filter_map(|item| item.get_path(field).cloned())
                .collect(),
            AggregateMode::Items => items.iter().map(ExecutionItem::to_value).collect(),
        };

        let mut out = ExecutionItem::new();
        out.set_path(&self.output_field, Value::Array(collected));
        vec![out]
    }
}
