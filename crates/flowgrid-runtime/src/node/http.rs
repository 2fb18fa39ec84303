//! HTTP request node configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// HTTP method for a request node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Configuration for an HTTP request node.
///
/// The URL, headers, and body are templates; `{{ $json.path }}`
/// placeholders are substituted per input item, and the node performs one
/// request per item. Request failures are converted into error-shaped
/// output items instead of failing the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestConfig {
    /// Request method.
    #[serde(default)]
    pub method: HttpMethod,
    /// URL template.
    pub url: String,
    /// Header templates.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Body template; sent as JSON when it parses as JSON, text otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Per-request timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl HttpRequestConfig {
    /// Returns the configured per-request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_converts_to_reqwest() {
        assert_eq!(reqwest::Method::from(HttpMethod::Post), reqwest::Method::POST);
        assert_eq!(reqwest::Method::from(HttpMethod::default()), reqwest::Method::GET);
    }

    #[test]
    fn deserializes_uppercase_methods() {
        let config: HttpRequestConfig = serde_json::from_value(serde_json::json!({
            "method": "DELETE",
            "url": "https://api.example.com/items/{{ $json.id }}",
        }))
        .unwrap();
        assert_eq!(config.method, HttpMethod::Delete);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn timeout_converts_to_duration() {
        let config = HttpRequestConfig {
            method: HttpMethod::Get,
            url: "https://example.com".into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: Some(1500),
        };
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
    }
}
