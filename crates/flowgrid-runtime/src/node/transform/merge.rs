//! Merge node: combine inputs from multiple branches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::item::ExecutionItem;

/// How combined items are paired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum CombineBy {
    /// Zip items pairwise by position.
    Position,
    /// Group items by a field's value, shallow-merging payloads.
    Key {
        /// Dot path of the grouping field.
        field: String,
    },
}

/// Merge strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MergeMode {
    /// Concatenate all branches in order.
    Append,
    /// Pair items across branches.
    Combine {
        /// Pairing strategy.
        #[serde(flatten)]
        by: CombineBy,
    },
    /// Keep the first branch only.
    ChooseBranch,
    /// Pass every branch through unchanged.
    Multiplex,
}

/// Configuration for a merge node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Merge strategy.
    #[serde(flatten)]
    pub mode: MergeMode,
}

impl MergeConfig {
    /// Merges per-branch inputs; `branches` holds one item list per
    /// incoming connection, in connection order.
    pub fn apply(&self, branches: &[Vec<ExecutionItem>]) -> Vec<ExecutionItem> {
        match &self.mode {
            MergeMode::Append | MergeMode::Multiplex => {
                branches.iter().flatten().cloned().collect()
            }
            MergeMode::ChooseBranch => branches.first().cloned().unwrap_or_default(),
            MergeMode::Combine { by: CombineBy::Position } => combine_by_position(branches),
            MergeMode::Combine { by: CombineBy::Key { field } } => {
                combine_by_key(branches, field)
            }
        }
    }
}

/// Zips the first two branches pairwise; with a single branch, zips its
/// first half against its second half.
fn combine_by_position(branches: &[Vec<ExecutionItem>]) -> Vec<ExecutionItem> {
    let (left, right): (Vec<ExecutionItem>, Vec<ExecutionItem>) = match branches {
        [] => return Vec::new(),
        [only] => {
            let mid = only.len() / 2;
            (only[..mid].to_vec(), only[mid..].to_vec())
        }
        [first, second, ..] => (first.clone(), second.clone()),
    };

    left.into_iter()
        .zip(right)
        .map(|(a, b)| shallow_merge(a, &b))
        .collect()
}

/// Groups all items by a field's serialized value, shallow-merging the
/// payloads of duplicates; first-seen order, unkeyed items dropped.
fn combine_by_key(branches: &[Vec<ExecutionItem>], field: &str) -> Vec<ExecutionItem> {
    let mut order = Vec::new();
    let mut merged: HashMap<String, ExecutionItem> = HashMap::new();

    for item in branches.iter().flatten() {
        let Some(key) = item.get_path(field).map(ToString::to_string) else {
            continue;
        };
        match merged.get_mut(&key) {
            Some(existing) => *existing = shallow_merge(existing.clone(), item),
            None => {
                order.push(key.clone());
                merged.insert(key, item.clone());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect()
}

/// Copies `other`'s top-level fields over `base`'s payload.
fn shallow_merge(mut base: ExecutionItem, other: &ExecutionItem) -> ExecutionItem {
    for (key, value) in &other.json {
        base.json.insert(key.clone(), value.clone());
    }
    base
}
