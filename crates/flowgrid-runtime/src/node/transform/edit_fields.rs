//! Edit-fields node: set, remove, and rename payload fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WorkflowError, WorkflowResult};
use crate::item::ExecutionItem;

/// Target type for set-value coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoerceType {
    /// Cast to a string.
    String,
    /// Parse as a number.
    Number,
    /// Cast to a boolean.
    Boolean,
    /// Parse a string value as JSON.
    Json,
}

/// One field edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditOperation {
    /// Write a value to a dot path.
    Set {
        /// Target dot path.
        field: String,
        /// Value to write.
        value: Value,
        /// Optional type coercion applied to the value.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coerce: Option<CoerceType>,
    },
    /// Remove a dot path.
    Remove {
        /// Path to remove.
        field: String,
    },
    /// Rename a top-level or nested field.
    Rename {
        /// Current path.
        from: String,
        /// New path.
        to: String,
    },
}

/// Configuration for an edit-fields node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditFieldsConfig {
    /// Edits applied in order to each item.
    #[serde(default)]
    pub operations: Vec<EditOperation>,
    /// Discard every field not written by a set operation.
    #[serde(default)]
    pub keep_only_set: bool,
}

impl EditFieldsConfig {
    /// Applies the edits to each item.
    pub fn apply(&self, items: &[ExecutionItem]) -> WorkflowResult<Vec<ExecutionItem>> {
        items.iter().map(|item| self.apply_one(item)).collect()
    }

    fn apply_one(&self, item: &ExecutionItem) -> WorkflowResult<ExecutionItem> {
        let mut out = if self.keep_only_set {
            ExecutionItem { json: Default::default(), ..item.clone() }
        } else {
            item.clone()
        };

        for operation in &self.operations {
            match operation {
                EditOperation::Set { field, value, coerce } => {
                    let value = match coerce {
                        Some(kind) => coerce_value(value, *kind)?,
                        None => value.clone(),
                    };
                    out.set_path(field, value);
                }
                EditOperation::Remove { field } => {
                    out.remove_path(field);
                }
                EditOperation::Rename { from, to } => {
                    // Rename reads from the original payload so it also
                    // works under keep_only_set.
                    let source = if self.keep_only_set { item } else { &out };
                    if let Some(value) = source.get_path(from).cloned() {
                        out.remove_path(from);
                        out.set_path(to, value);
                    }
                }
            }
        }
        Ok(out)
    }
}

fn coerce_value(value: &Value, kind: CoerceType) -> WorkflowResult<Value> {
    let coerced = match kind {
        CoerceType::String => match value {
            Value::String(text) => Value::from(text.clone()),
            other => Value::from(other.to_string()),
        },
        CoerceType::Number => match value {
            Value::Number(number) => Value::Number(number.clone()),
            Value::String(text) => {
                let parsed: f64 = text.trim().parse().map_err(|_| {
                    WorkflowError::InvalidDefinition(format!("'{text}' is not a number"))
                })?;
                Value::from(parsed)
            }
            Value::Bool(flag) => Value::from(if *flag { 1 } else { 0 }),
            other => {
                return Err(WorkflowError::InvalidDefinition(format!(
                    "cannot coerce {other} to a number"
                )));
            }
        },
        CoerceType::Boolean => match value {
            Value::Bool(flag) => Value::Bool(*flag),
            Value::String(text) => Value::Bool(text.eq_ignore_ascii_case("true")),
            Value::Number(number) => Value::Bool(number.as_f64().is_some_and(|f| f != 0.0)),
            _ => Value::Bool(false),
        },
        CoerceType::Json => match value {
            Value::String(text) => serde_json::from_str(text).map_err(|e| {
                WorkflowError::InvalidDefinition(format!("invalid JSON value: {e}"))
            })?,
            other => other.clone(),
        },
    };
    Ok(coerced)
}
