//! The item model flowing on every graph edge.
//!
//! A node's input and output are always an ordered list of
//! [`ExecutionItem`]s, never a bare object. Lists may be empty; the `json`
//! payload is always present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Link back to the input item an output item was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedItem {
    /// Index of the source item in the node's input list.
    pub item: usize,
}

/// The unit of data flowing between nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionItem {
    /// Structured payload; always present, possibly empty.
    #[serde(default)]
    pub json: Map<String, Value>,

    /// Binary attachments keyed by property name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<Map<String, Value>>,

    /// Provenance link to the originating input item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_item: Option<PairedItem>,
}

impl ExecutionItem {
    /// Creates an item with an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an item from a JSON object map.
    pub fn from_object(json: Map<String, Value>) -> Self {
        Self { json, ..Default::default() }
    }

    /// Wraps an arbitrary value as an item.
    ///
    /// Objects become the payload directly; `null` becomes an empty
    /// payload; anything else is stored under a `value` key.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(json) => Self::from_object(json),
            Value::Null => Self::new(),
            other => {
                let mut json = Map::new();
                json.insert("value".into(), other);
                Self::from_object(json)
            }
        }
    }

    /// Returns the payload as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.json.clone())
    }

    /// Looks up a value by dot path, descending through objects and
    /// numeric array indices.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.json.get(first)?;

        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(array) => array.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Sets a value by dot path, creating intermediate objects as needed.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = match segments.pop() {
            Some(last) if !last.is_empty() => last,
            _ => return,
        };

        let mut current = &mut self.json;
        for segment in segments {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = entry.as_object_mut().expect("entry forced to object");
        }
        current.insert(last.to_string(), value);
    }

    /// Removes a value by dot path, returning it when present.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop()?;

        let mut current = &mut self.json;
        for segment in segments {
            current = current.get_mut(segment)?.as_object_mut()?;
        }
        current.remove(last)
    }
}

/// Normalizes a sandbox return value into the item list contract.
///
/// `null`/undefined become a single `{value: null}` item; arrays of
/// item-shaped objects pass through unchanged; other arrays wrap each
/// element; a lone object becomes a single item; primitives are stored
/// under `value`.
pub fn normalize_output(value: Value) -> Vec<ExecutionItem> {
    match value {
        Value::Null => vec![null_item()],
        Value::Array(elements) => {
            if !elements.is_empty() && elements.iter().all(is_item_shaped) {
                elements
                    .into_iter()
                    .filter_map(|element| serde_json::from_value(element).ok())
                    .collect()
            } else {
                elements
                    .into_iter()
                    .map(|element| match element {
                        Value::Object(json) => ExecutionItem::from_object(json),
                        other => ExecutionItem::from_value(other),
                    })
                    .collect()
            }
        }
        Value::Object(json) => {
            let as_value = Value::Object(json);
            if is_item_shaped(&as_value) {
                serde_json::from_value(as_value.clone())
                    .map(|item| vec![item])
                    .unwrap_or_else(|_| vec![ExecutionItem::from_value(as_value)])
            } else {
                vec![ExecutionItem::from_value(as_value)]
            }
        }
        primitive => vec![ExecutionItem::from_value(primitive)],
    }
}

fn null_item() -> ExecutionItem {
    let mut json = Map::new();
    json.insert("value".into(), Value::Null);
    ExecutionItem::from_object(json)
}

/// Whether a value looks like a serialized [`ExecutionItem`].
fn is_item_shaped(value: &Value) -> bool {
    let Value::Object(map) = value else {
        return false;
    };
    map.get("json").is_some_and(Value::is_object)
        && map
            .keys()
            .all(|key| matches!(key.as_str(), "json" | "binary" | "pairedItem"))
}
