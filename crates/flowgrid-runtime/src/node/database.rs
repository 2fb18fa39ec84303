//! Database node configuration.
//!
//! Database nodes resolve a connector from the organization's credential
//! set, interpolate `{{ $json.path }}` placeholders against the first
//! input item, and hand a flavor-specific statement to the connector. The
//! connector is always disconnected afterward, success or not.

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::error::{WorkflowError, WorkflowResult};
use crate::item::ExecutionItem;
use crate::node::template::interpolate_placeholders;

/// Supported database flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataFlavor {
    Postgres,
    Mysql,
    Mongodb,
    Redis,
}

/// A statement ready for a connector, placeholders resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataStatement {
    /// SQL text for relational flavors.
    Query {
        /// Statement text.
        text: String,
    },
    /// Document operation for MongoDB.
    Document {
        /// Target collection.
        collection: String,
        /// Operation name (find, insertOne, ...).
        operation: String,
        /// JSON filter/payload text.
        query: String,
    },
    /// Key/value command for Redis.
    Command {
        /// Command name (get, set, del, ...).
        command: String,
        /// Target key.
        key: String,
        /// Optional value operand.
        value: Option<String>,
    },
}

/// Configuration for a database node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database flavor; selects the connector type.
    pub flavor: DataFlavor,
    /// Credential name resolved against the organization's registry.
    pub credential: String,
    /// SQL text (relational flavors).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Target collection (MongoDB).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Document operation (MongoDB).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Command name (Redis).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Target key (Redis).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Value operand (Redis).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl DatabaseConfig {
    /// Builds the flavor-specific statement, interpolating placeholders
    /// against the first input item. Missing required fields are
    /// configuration errors raised before any I/O.
    pub fn statement(&self, first_item: Option<&ExecutionItem>) -> WorkflowResult<DataStatement> {
        let missing = |field: &str| {
            WorkflowError::InvalidDefinition(format!(
                "{} node requires '{field}'",
                <&'static str>::from(self.flavor),
            ))
        };
        let fill = |template: &str| interpolate_placeholders(template, first_item);

        match self.flavor {
            DataFlavor::Postgres | DataFlavor::Mysql => {
                let query = self.query.as_deref().ok_or_else(|| missing("query"))?;
                Ok(DataStatement::Query { text: fill(query) })
            }
            DataFlavor::Mongodb => {
                let collection =
                    self.collection.as_deref().ok_or_else(|| missing("collection"))?;
                let operation = self.operation.as_deref().ok_or_else(|| missing("operation"))?;
                let query = self.query.as_deref().unwrap_or("{}");
                Ok(DataStatement::Document {
                    collection: fill(collection),
                    operation: operation.to_string(),
                    query: fill(query),
                })
            }
            DataFlavor::Redis => {
                let command = self.command.as_deref().ok_or_else(|| missing("command"))?;
                let key = self.key.as_deref().ok_or_else(|| missing("key"))?;
                Ok(DataStatement::Command {
                    command: command.to_string(),
                    key: fill(key),
                    value: self.value.as_deref().map(fill),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(flavor: DataFlavor) -> DatabaseConfig {
        DatabaseConfig {
            flavor,
            credential: "main-db".into(),
            query: None,
            collection: None,
            operation: None,
            command: None,
            key: None,
            value: None,
        }
    }

    #[test]
    fn sql_query_interpolates_first_item() {
        let item = ExecutionItem::from_value(json!({ "user": { "id": 9 } }));
        let statement = DatabaseConfig {
            query: Some("SELECT * FROM orders WHERE user_id = {{ $json.user.id }}".into()),
            ..config(DataFlavor::Postgres)
        }
        .statement(Some(&item))
        .unwrap();
        assert_eq!(
            statement,
            DataStatement::Query { text: "SELECT * FROM orders WHERE user_id = 9".into() }
        );
    }

    #[test]
    fn missing_query_is_a_config_error() {
        let result = config(DataFlavor::Mysql).statement(None);
        assert!(matches!(result, Err(WorkflowError::InvalidDefinition(_))));
    }

    #[test]
    fn mongodb_requires_collection_and_operation() {
        let result = DatabaseConfig {
            collection: Some("users".into()),
            ..config(DataFlavor::Mongodb)
        }
        .statement(None);
        assert!(result.is_err());

        let statement = DatabaseConfig {
            collection: Some("users".into()),
            operation: Some("find".into()),
            query: Some("{\"name\": \"{{ $json.name }}\"}".into()),
            ..config(DataFlavor::Mongodb)
        }
        .statement(Some(&ExecutionItem::from_value(json!({ "name": "ada" }))))
        .unwrap();
        assert_eq!(
            statement,
            DataStatement::Document {
                collection: "users".into(),
                operation: "find".into(),
                query: "{\"name\": \"ada\"}".into(),
            }
        );
    }

    #[test]
    fn redis_interpolates_key_and_value() {
        let item = ExecutionItem::from_value(json!({ "id": 4, "name": "ada" }));
        let statement = DatabaseConfig {
            command: Some("set".into()),
            key: Some("user:{{ $json.id }}".into()),
            value: Some("{{ $json.name }}".into()),
            ..config(DataFlavor::Redis)
        }
        .statement(Some(&item))
        .unwrap();
        assert_eq!(
            statement,
            DataStatement::Command {
                command: "set".into(),
                key: "user:4".into(),
                value: Some("ada".into()),
            }
        );
    }
}
