//! Condition evaluation shared by filter and routing nodes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WorkflowError, WorkflowResult};
use crate::item::ExecutionItem;

/// How multiple conditions combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    /// Every condition must match.
    #[default]
    And,
    /// Any condition may match.
    Or,
}

/// Comparison operator for a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    IsEmpty,
    IsNotEmpty,
    IsTrue,
    IsFalse,
    Regex,
}

/// A single condition against one field of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dot path into the item payload.
    pub field: String,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Right-hand operand; unused by unary operators.
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    /// Creates a condition.
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self { field: field.into(), operator, value }
    }

    /// Evaluates the condition against an item.
    ///
    /// Numeric operators coerce both operands through a numeric cast and
    /// never match when either side is not a number (NaN-safe). String
    /// operators coerce through a string cast. A missing field reads as
    /// null.
    pub fn matches(&self, item: &ExecutionItem) -> WorkflowResult<bool> {
        let actual = item.get_path(&self.field).cloned().unwrap_or(Value::Null);

        let result = match self.operator {
            ConditionOperator::Equals => loose_equals(&actual, &self.value),
            ConditionOperator::NotEquals => !loose_equals(&actual, &self.value),
            ConditionOperator::Contains => {
                string_cast(&actual).contains(&string_cast(&self.value))
            }
            ConditionOperator::NotContains => {
                !string_cast(&actual).contains(&string_cast(&self.value))
            }
            ConditionOperator::StartsWith => {
                string_cast(&actual).starts_with(&string_cast(&self.value))
            }
            ConditionOperator::EndsWith => {
                string_cast(&actual).ends_with(&string_cast(&self.value))
            }
            ConditionOperator::GreaterThan => numeric_compare(&actual, &self.value, |a, b| a > b),
            ConditionOperator::LessThan => numeric_compare(&actual, &self.value, |a, b| a < b),
            ConditionOperator::GreaterOrEqual => {
                numeric_compare(&actual, &self.value, |a, b| a >= b)
            }
            ConditionOperator::LessOrEqual => {
                numeric_compare(&actual, &self.value, |a, b| a <= b)
            }
            ConditionOperator::IsEmpty => is_empty(&actual),
            ConditionOperator::IsNotEmpty => !is_empty(&actual),
            ConditionOperator::IsTrue => actual == Value::Bool(true),
            ConditionOperator::IsFalse => actual == Value::Bool(false),
            ConditionOperator::Regex => {
                let pattern = string_cast(&self.value);
                let regex = regex::Regex::new(&pattern).map_err(|e| {
                    WorkflowError::InvalidDefinition(format!("invalid regex '{pattern}': {e}"))
                })?;
                regex.is_match(&string_cast(&actual))
            }
        };

        Ok(result)
    }
}

/// Evaluates a condition list under a combine mode.
///
/// With no conditions, `And` passes everything and `Or` passes nothing.
pub fn evaluate_conditions(
    conditions: &[Condition],
    combine: CombineMode,
    item: &ExecutionItem,
) -> WorkflowResult<bool> {
    match combine {
        CombineMode::And => {
            for condition in conditions {
                if !condition.matches(item)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        CombineMode::Or => {
            for condition in conditions {
                if condition.matches(item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Equality with numeric preference: both sides numeric compares as
/// numbers, otherwise as strings.
fn loose_equals(left: &Value, right: &Value) -> bool {
    match (numeric_cast(left), numeric_cast(right)) {
        (Some(a), Some(b)) => a == b,
        _ => string_cast(left) == string_cast(right),
    }
}

fn numeric_compare(left: &Value, right: &Value, compare: impl Fn(f64, f64) -> bool) -> bool {
    match (numeric_cast(left), numeric_cast(right)) {
        (Some(a), Some(b)) => compare(a, b),
        _ => false,
    }
}

fn numeric_cast(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|f| !f.is_nan()),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn string_cast(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(array) => array.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
