//! External collaborator interfaces.
//!
//! The engine is constructed with these traits injected; persistence,
//! credentials, package resolution, and external node packages all live
//! behind them. In-memory implementations are provided for embedding and
//! tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::WorkflowDefinition;
use crate::item::ExecutionItem;
use crate::node::{DataFlavor, DataStatement, NodeId, OrganizationId, WorkflowId};

/// Read access to persisted workflow definitions.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Loads a workflow definition scoped to an organization.
    async fn load(
        &self,
        workflow_id: WorkflowId,
        organization_id: OrganizationId,
    ) -> WorkflowResult<WorkflowDefinition>;
}

/// A live database connection resolved from a credential.
///
/// Connectors are acquired per node invocation and released afterward;
/// the engine calls [`DataConnector::disconnect`] regardless of outcome.
#[async_trait]
pub trait DataConnector: Send + Sync {
    /// The database flavor this connector speaks.
    fn flavor(&self) -> DataFlavor;

    /// Executes a statement and returns rows/documents as JSON values.
    async fn execute(&self, statement: &DataStatement) -> WorkflowResult<Vec<Value>>;

    /// Releases the underlying connection.
    async fn disconnect(&self);
}

/// Per-organization credential set mapping names to connectors.
#[derive(Clone, Default)]
pub struct CredentialsRegistry {
    connectors: HashMap<String, Arc<dyn DataConnector>>,
}

impl CredentialsRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connector under a credential name.
    pub fn register(&mut self, name: impl Into<String>, connector: Arc<dyn DataConnector>) {
        self.connectors.insert(name.into(), connector);
    }

    /// Resolves a connector by credential name and flavor.
    ///
    /// A missing name or a flavor mismatch is a configuration error
    /// raised before any I/O happens.
    pub fn resolve(
        &self,
        name: &str,
        flavor: DataFlavor,
    ) -> WorkflowResult<Arc<dyn DataConnector>> {
        let connector = self
            .connectors
            .get(name)
            .ok_or_else(|| WorkflowError::CredentialsNotFound(name.to_string()))?;

        if connector.flavor() != flavor {
            return Err(WorkflowError::InvalidDefinition(format!(
                "credential '{name}' is {}, node expects {}",
                <&'static str>::from(connector.flavor()),
                <&'static str>::from(flavor),
            )));
        }
        Ok(connector.clone())
    }

    /// Returns the number of registered credentials.
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    /// Returns true if no credentials are registered.
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl std::fmt::Debug for CredentialsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRegistry")
            .field("names", &self.connectors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Source of per-organization credential sets.
#[async_trait]
pub trait CredentialsService: Send + Sync {
    /// Returns the organization's credential registry.
    async fn credentials(&self, organization_id: OrganizationId)
    -> WorkflowResult<CredentialsRegistry>;
}

/// Resolver for organization-installed sandbox modules.
#[async_trait]
pub trait PackageProvider: Send + Sync {
    /// Returns the JavaScript source for a module, if installed.
    async fn resolve(
        &self,
        organization_id: OrganizationId,
        module: &str,
    ) -> WorkflowResult<Option<String>>;
}

/// Executor for an externally-provided node type.
#[async_trait]
pub trait ExternalNodeExecutor: Send + Sync {
    /// Executes the node against its input items.
    async fn execute(
        &self,
        node_id: NodeId,
        config: &Value,
        items: &[ExecutionItem],
    ) -> WorkflowResult<Vec<ExecutionItem>>;
}

/// Lookup for external node executors by type name.
pub trait NodeRegistry: Send + Sync {
    /// Whether a node type is available.
    fn contains(&self, type_name: &str) -> bool;

    /// Returns the executor for a node type.
    fn get(&self, type_name: &str) -> Option<Arc<dyn ExternalNodeExecutor>>;
}

/// In-memory workflow store keyed by workflow and organization.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<(WorkflowId, OrganizationId), WorkflowDefinition>>,
}

impl InMemoryWorkflowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a workflow definition.
    pub async fn insert(
        &self,
        workflow_id: WorkflowId,
        organization_id: OrganizationId,
        definition: WorkflowDefinition,
    ) {
        self.workflows
            .write()
            .await
            .insert((workflow_id, organization_id), definition);
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn load(
        &self,
        workflow_id: WorkflowId,
        organization_id: OrganizationId,
    ) -> WorkflowResult<WorkflowDefinition> {
        self.workflows
            .read()
            .await
            .get(&(workflow_id, organization_id))
            .cloned()
            .ok_or(WorkflowError::WorkflowNotFound)
    }
}

/// Credentials service serving one fixed registry to every organization.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    registry: CredentialsRegistry,
}

impl StaticCredentials {
    /// Wraps a fixed registry.
    pub fn new(registry: CredentialsRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl CredentialsService for StaticCredentials {
    async fn credentials(
        &self,
        _organization_id: OrganizationId,
    ) -> WorkflowResult<CredentialsRegistry> {
        Ok(self.registry.clone())
    }
}

/// Package provider with no installed packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPackages;

#[async_trait]
impl PackageProvider for NoPackages {
    async fn resolve(
        &self,
        _organization_id: OrganizationId,
        _module: &str,
    ) -> WorkflowResult<Option<String>> {
        Ok(None)
    }
}

/// Node registry with no external node types.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyNodeRegistry;

impl NodeRegistry for EmptyNodeRegistry {
    fn contains(&self, _type_name: &str) -> bool {
        false
    }

    fn get(&self, _type_name: &str) -> Option<Arc<dyn ExternalNodeExecutor>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeConnector(DataFlavor);

    #[async_trait]
    impl DataConnector for FakeConnector {
        fn flavor(&self) -> DataFlavor {
            self.0
        }

        async fn execute(&self, _statement: &DataStatement) -> WorkflowResult<Vec<Value>> {
            Ok(vec![])
        }

        async fn disconnect(&self) {}
    }

    #[test]
    fn resolve_checks_name_and_flavor() {
        let mut registry = CredentialsRegistry::new();
        registry.register("main-db", Arc::new(FakeConnector(DataFlavor::Postgres)));

        assert!(registry.resolve("main-db", DataFlavor::Postgres).is_ok());
        assert!(matches!(
            registry.resolve("other", DataFlavor::Postgres),
            Err(WorkflowError::CredentialsNotFound(_))
        ));
        assert!(matches!(
            registry.resolve("main-db", DataFlavor::Redis),
            Err(WorkflowError::InvalidDefinition(_))
        ));
    }

    #[tokio::test]
    async fn in_memory_store_scopes_by_organization() {
        let store = InMemoryWorkflowStore::new();
        let workflow_id = WorkflowId::new();
        let organization_id = OrganizationId::new();
        store
            .insert(workflow_id, organization_id, WorkflowDefinition::default())
            .await;

        assert!(store.load(workflow_id, organization_id).await.is_ok());
        assert!(matches!(
            store.load(workflow_id, OrganizationId::new()).await,
            Err(WorkflowError::WorkflowNotFound)
        ));
    }

    #[tokio::test]
    async fn no_packages_resolves_nothing() {
        let resolved = NoPackages.resolve(OrganizationId::new(), "lodash").await.unwrap();
        assert!(resolved.is_none());
    }
}
