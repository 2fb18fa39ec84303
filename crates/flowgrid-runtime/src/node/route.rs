//! Conditional routing nodes.
//!
//! Routing nodes send each item to exactly one named output port; the
//! edge's `from_port` selects which branch a downstream node receives.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowResult;
use crate::item::ExecutionItem;
use crate::node::condition::{CombineMode, Condition, evaluate_conditions};

/// Port carrying items whose conditions matched.
pub const TRUE_PORT: &str = "true";
/// Port carrying items whose conditions did not match.
pub const FALSE_PORT: &str = "false";
/// Port carrying items no switch case matched.
pub const FALLBACK_PORT: &str = "fallback";

/// Items grouped by output port.
pub type RoutedItems = HashMap<String, Vec<ExecutionItem>>;

/// Configuration for an if node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IfConfig {
    /// Conditions evaluated per item.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Whether all or any condition must match.
    #[serde(default)]
    pub combine: CombineMode,
}

impl IfConfig {
    /// Routes each item to the `true` or `false` port.
    pub fn route(&self, items: &[ExecutionItem]) -> WorkflowResult<RoutedItems> {
        let mut routed = RoutedItems::new();
        routed.insert(TRUE_PORT.into(), Vec::new());
        routed.insert(FALSE_PORT.into(), Vec::new());

        for item in items {
            let port = if evaluate_conditions(&self.conditions, self.combine, item)? {
                TRUE_PORT
            } else {
                FALSE_PORT
            };
            routed.get_mut(port).expect("port preinserted").push(item.clone());
        }
        Ok(routed)
    }
}

/// One switch case with its output port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// Output port receiving matching items.
    pub port: String,
    /// Conditions evaluated per item.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Whether all or any condition must match.
    #[serde(default)]
    pub combine: CombineMode,
}

/// Configuration for a switch node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Cases evaluated in order; first match wins.
    #[serde(default)]
    pub cases: Vec<SwitchCase>,
    /// Route unmatched items to the fallback port instead of dropping
    /// them.
    #[serde(default)]
    pub fallback_output: bool,
}

impl SwitchConfig {
    /// Routes each item to the first matching case's port; unmatched
    /// items go to the fallback port when enabled, otherwise they are
    /// dropped.
    pub fn route(&self, items: &[ExecutionItem]) -> WorkflowResult<RoutedItems> {
        let mut routed = RoutedItems::new();
        for case in &self.cases {
            routed.entry(case.port.clone()).or_default();
        }
        if self.fallback_output {
            routed.entry(FALLBACK_PORT.into()).or_default();
        }

        for item in items {
            let mut matched = false;
            for case in &self.cases {
                if evaluate_conditions(&case.conditions, case.combine, item)? {
                    routed.entry(case.port.clone()).or_default().push(item.clone());
                    matched = true;
                    break;
                }
            }
            if !matched && self.fallback_output {
                routed.entry(FALLBACK_PORT.into()).or_default().push(item.clone());
            }
        }
        Ok(routed)
    }
}
