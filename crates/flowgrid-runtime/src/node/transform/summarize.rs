//! Summarize node: compute aggregate statistics over all items.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::ExecutionItem;

fn default_separator() -> String {
    ",".into()
}

/// A single summarize operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SummarizeOp {
    /// Number of input items.
    Count,
    /// Numeric sum of a field.
    Sum {
        /// Dot path of the summed field.
        field: String,
    },
    /// Numeric average of a field.
    Average {
        /// Dot path of the averaged field.
        field: String,
    },
    /// Numeric minimum of a field.
    Min {
        /// Dot path of the field.
        field: String,
    },
    /// Numeric maximum of a field.
    Max {
        /// Dot path of the field.
        field: String,
    },
    /// String concatenation of a field.
    Concat {
        /// Dot path of the field.
        field: String,
        /// Separator between values.
        #[serde(default = "default_separator")]
        separator: String,
    },
}

/// One summarize operation writing to a named output field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeOperation {
    /// The statistic to compute.
    #[serde(flatten)]
    pub op: SummarizeOp,
    /// Field the result is written to.
    pub output_field: String,
}

/// Configuration for a summarize node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummarizeConfig {
    /// Operations applied over all items.
    #[serde(default)]
    pub operations: Vec<SummarizeOperation>,
    /// Grouping field; accepted in the definition but not applied during
    /// aggregation (all items summarize into one).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

impl SummarizeConfig {
    /// Collapses all items into a single summary item.
    pub fn apply(&self, items: &[ExecutionItem]) -> Vec<ExecutionItem> {
        let mut out = ExecutionItem::new();

        for operation in &self.operations {
            let value = match &operation.op {
                SummarizeOp::Count => Value::from(items.len()),
                SummarizeOp::Sum { field } => {
                    Value::from(numbers(items, field).into_iter().sum::<f64>())
                }
                SummarizeOp::Average { field } => {
                    let values = numbers(items, field);
                    if values.is_empty() {
                        Value::Null
                    } else {
                        Value::from(values.iter().sum::<f64>() / values.len() as f64)
                    }
                }
                SummarizeOp::Min { field } => numbers(items, field)
                    .into_iter()
                    .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.min(v))))
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                SummarizeOp::Max { field } => numbers(items, field)
                    .into_iter()
                    .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.max(v))))
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                SummarizeOp::Concat { field, separator } => Value::from(
                    items
                        .iter()
                        .filter_map(|item| item.get_path(field))
                        .map(text_cast)
                        .collect::<Vec<_>>()
                        .join(separator),
                ),
            };
            out.set_path(&operation.output_field, value);
        }

        vec![out]
    }
}

fn numbers(items: &[ExecutionItem], field: &str) -> Vec<f64> {
    items
        .iter()
        .filter_map(|item| item.get_path(field))
        .filter_map(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .collect()
}

fn text_cast(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
