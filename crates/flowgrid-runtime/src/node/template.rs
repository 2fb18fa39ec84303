//! `{{ $json.path }}` placeholder interpolation.
//!
//! Database and HTTP nodes substitute placeholders against the first input
//! item before issuing a request. A missing path interpolates as an empty
//! string; string values insert verbatim, other values insert their JSON
//! form.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::item::ExecutionItem;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\$json\.([A-Za-z0-9_.]+)\s*\}\}").expect("valid regex")
});

/// Replaces every `{{ $json.path }}` placeholder with the item's value at
/// that dot path.
pub fn interpolate_placeholders(template: &str, item: Option<&ExecutionItem>) -> String {
    PLACEHOLDER
        .replace_all(template, |captures: &regex::Captures<'_>| {
            item.and_then(|item| item.get_path(&captures[1]))
                .map(placeholder_text)
                .unwrap_or_default()
        })
        .into_owned()
}

fn placeholder_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_nested_paths() {
        let item = ExecutionItem::from_value(json!({ "user": { "id": 7, "name": "ada" } }));
        let out = interpolate_placeholders(
            "SELECT * FROM logs WHERE user_id = {{ $json.user.id }} -- {{$json.user.name}}",
            Some(&item),
        );
        assert_eq!(out, "SELECT * FROM logs WHERE user_id = 7 -- ada");
    }

    #[test]
    fn missing_path_becomes_empty() {
        let item = ExecutionItem::from_value(json!({}));
        assert_eq!(interpolate_placeholders("v={{ $json.absent }}", Some(&item)), "v=");
    }

    #[test]
    fn no_item_interpolates_empty() {
        assert_eq!(interpolate_placeholders("v={{ $json.x }}", None), "v=");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        let item = ExecutionItem::from_value(json!({ "x": 1 }));
        assert_eq!(interpolate_placeholders("SELECT 1", Some(&item)), "SELECT 1");
    }
}
