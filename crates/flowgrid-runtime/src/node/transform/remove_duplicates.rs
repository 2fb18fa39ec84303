//! Remove-duplicates node: drop repeated items, keeping first occurrences.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::item::ExecutionItem;

/// Configuration for a remove-duplicates node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoveDuplicatesConfig {
    /// Dot path whose serialized value identifies duplicates; full-payload
    /// equality when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_field: Option<String>,
}

impl RemoveDuplicatesConfig {
    /// Dedupes the items, first occurrence wins, order preserved.
    pub fn apply(&self, items: &[ExecutionItem]) -> Vec<ExecutionItem> {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();

        for item in items {
            let key = match &self.compare_field {
                Some(field) => item
                    .get_path(field)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                None => item.to_value().to_string(),
            };
            if seen.insert(key) {
                kept.push(item.clone());
            }
        }
        kept
    }
}
