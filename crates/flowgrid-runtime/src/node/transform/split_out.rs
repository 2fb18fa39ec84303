//! Split-out node: expand an array-valued field into one item per element.

use serde::{Deserialize, Serialize};

use crate::item::{ExecutionItem, PairedItem};

fn default_true() -> bool {
    true
}

/// Configuration for a split-out node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitOutConfig {
    /// Dot path of the array field to expand.
    pub field: String,
    /// Keep the item's other fields on each expanded item.
    #[serde(default = "default_true")]
    pub include_other_fields: bool,
}

impl SplitOutConfig {
    /// Expands each item's array field into one item per element.
    ///
    /// Items whose field is missing or not an array pass through
    /// unchanged. Expanded items record their source index.
    pub fn apply(&self, items: &[ExecutionItem]) -> Vec<ExecutionItem> {
        let mut out = Vec::new();

        for (index, item) in items.iter().enumerate() {
            let Some(serde_json::Value::Array(elements)) = item.get_path(&self.field).cloned()
            else {
                out.push(item.clone());
                continue;
            };

            for element in elements {
                let mut expanded = if self.include_other_fields {
                    let mut clone = item.clone();
                    clone.remove_path(&self.field);
                    clone
                } else {
                    ExecutionItem::new()
                };
                expanded.set_path(&self.field, element);
                expanded.paired_item = Some(PairedItem { item: index });
                out.push(expanded);
            }
        }
        out
    }
}
