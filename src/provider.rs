//! # Provider
//!
//! Entry point for all resource operations. The provider owns the Vault
//! client and the registry of resource and data source types, checks every
//! configuration against the type's schema before a request is made, and runs
//! each operation inside a `resource_operation` span.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Instrument;

use crate::client::{HttpLogicalClient, LogicalClient};
use crate::config::ProviderConfig;
use crate::data_sources::{self, DataSource};
use crate::errors::{ProviderError, Result};
use crate::mutex::MutexRegistry;
use crate::resources::{self, Resource, ResourceData};
use crate::schema::Schema;
use crate::{data_source_span, resource_span};

/// What a resource implementation gets to work with.
#[derive(Clone)]
pub struct ProviderContext {
    pub client: Arc<dyn LogicalClient>,
    pub locks: Arc<MutexRegistry>,
    pub config: ProviderConfig,
}

impl ProviderContext {
    pub fn new(config: ProviderConfig, client: Arc<dyn LogicalClient>) -> Self {
        Self { client, locks: MutexRegistry::global(), config }
    }

    /// Use a private lock registry instead of the process-wide one.
    pub fn with_locks(mut self, locks: Arc<MutexRegistry>) -> Self {
        self.locks = locks;
        self
    }
}

impl std::fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("config", &self.config)
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}

/// Registered resource and data source types, keyed by type name.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in type.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for resource in resources::builtin() {
            registry.register_resource(resource);
        }
        for data_source in data_sources::builtin() {
            registry.register_data_source(data_source);
        }
        registry
    }

    /// Register a resource type, replacing any previous one with the same name.
    pub fn register_resource(&mut self, resource: Arc<dyn Resource>) {
        self.resources.insert(resource.type_name(), resource);
    }

    pub fn register_data_source(&mut self, data_source: Arc<dyn DataSource>) {
        self.data_sources.insert(data_source.type_name(), data_source);
    }

    pub fn resource(&self, type_name: &str) -> Result<Arc<dyn Resource>> {
        self.resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::unknown_resource(type_name))
    }

    pub fn data_source(&self, type_name: &str) -> Result<Arc<dyn DataSource>> {
        self.data_sources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::unknown_data_source(type_name))
    }

    pub fn resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    pub fn data_source_types(&self) -> Vec<&'static str> {
        self.data_sources.keys().copied().collect()
    }
}

/// The configured provider.
#[derive(Clone)]
pub struct Provider {
    context: ProviderContext,
    registry: ResourceRegistry,
}

impl Provider {
    /// Connect to the configured server.
    ///
    /// Runs the `sys/health` probe unless `skip_health_check` is set.
    pub async fn configure(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        let client = HttpLogicalClient::new(&config)?;

        if config.skip_health_check {
            tracing::debug!("skipping Vault health check");
        } else {
            client.check_health().await?;
        }

        tracing::info!(address = %client.address(), "provider configured");
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Provider over an existing client, e.g. the in-memory one.
    pub fn with_client(config: ProviderConfig, client: Arc<dyn LogicalClient>) -> Self {
        Self {
            context: ProviderContext::new(config, client),
            registry: ResourceRegistry::builtin(),
        }
    }

    pub fn with_registry(mut self, registry: ResourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_locks(mut self, locks: Arc<MutexRegistry>) -> Self {
        self.context = self.context.with_locks(locks);
        self
    }

    pub fn context(&self) -> &ProviderContext {
        &self.context
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn resource_schema(&self, type_name: &str) -> Result<Schema> {
        Ok(self.registry.resource(type_name)?.schema())
    }

    pub fn data_source_schema(&self, type_name: &str) -> Result<Schema> {
        Ok(self.registry.data_source(type_name)?.schema())
    }

    /// Validate a configuration and fill in defaults. No request is made.
    pub fn plan(&self, type_name: &str, mut config: Map<String, Value>) -> Result<Map<String, Value>> {
        let schema = self.resource_schema(type_name)?;
        schema.validate(&config)?;
        schema.apply_defaults(&mut config);
        Ok(config)
    }

    pub async fn create(&self, type_name: &str, config: Map<String, Value>) -> Result<ResourceData> {
        let resource = self.registry.resource(type_name)?;
        let config = self.plan(type_name, config)?;
        let mut data = ResourceData::new(config);

        async {
            resource
                .create(&self.context, &mut data)
                .await
                .map_err(|e| e.with_context(format!("{} create", type_name)))?;
            if !data.is_present() {
                return Err(ProviderError::internal(format!(
                    "{} was created but could not be read back",
                    type_name
                )));
            }
            tracing::info!(id = data.id().unwrap_or_default(), "resource created");
            Ok(())
        }
        .instrument(resource_span!(type_name, "create"))
        .await?;

        Ok(data)
    }

    /// Refresh state. The returned data has no id if the object is gone.
    pub async fn read(&self, type_name: &str, mut state: ResourceData) -> Result<ResourceData> {
        let resource = self.registry.resource(type_name)?;
        let id = state.require_id()?.to_string();

        resource
            .read(&self.context, &mut state)
            .instrument(resource_span!(type_name, "read", id = id))
            .await
            .map_err(|e| e.with_context(format!("{} read", type_name)))?;

        if !state.is_present() {
            tracing::info!(resource_type = type_name, id = %id, "resource no longer exists");
        }
        Ok(state)
    }

    /// Apply a changed configuration to an existing object.
    ///
    /// A change to a `force_new` attribute is refused with
    /// [`ProviderError::RequiresReplacement`].
    pub async fn update(
        &self,
        type_name: &str,
        prior: ResourceData,
        config: Map<String, Value>,
    ) -> Result<ResourceData> {
        let resource = self.registry.resource(type_name)?;
        let schema = resource.schema();
        let id = prior.require_id()?.to_string();
        let mut config = self.plan(type_name, config)?;

        if let Some(attribute) = schema.replacement_trigger(prior.attributes(), &config) {
            return Err(ProviderError::requires_replacement(type_name, attribute));
        }

        // Carry computed values forward until the resource reads them again.
        for attribute in schema.attributes.iter().filter(|a| a.computed) {
            if config.get(attribute.name).map_or(true, Value::is_null) {
                if let Some(value) = prior.attributes().get(attribute.name) {
                    config.insert(attribute.name.to_string(), value.clone());
                }
            }
        }

        let mut data =
            ResourceData::for_update(Some(id.clone()), config, prior.attributes().clone());
        resource
            .update(&self.context, &mut data)
            .instrument(resource_span!(type_name, "update", id = id))
            .await
            .map_err(|e| e.with_context(format!("{} update", type_name)))?;
        Ok(data)
    }

    /// Create, update or replace, whichever brings `prior` to `config`.
    pub async fn apply(
        &self,
        type_name: &str,
        prior: Option<ResourceData>,
        config: Map<String, Value>,
    ) -> Result<ResourceData> {
        let prior = match prior.filter(ResourceData::is_present) {
            Some(prior) => self.read(type_name, prior).await?,
            None => return self.create(type_name, config).await,
        };
        if !prior.is_present() {
            return self.create(type_name, config).await;
        }

        match self.update(type_name, prior.clone(), config.clone()).await {
            Err(ProviderError::RequiresReplacement { attribute, .. }) => {
                tracing::warn!(
                    resource_type = type_name,
                    attribute = %attribute,
                    "attribute cannot be updated in place, replacing resource"
                );
                self.delete(type_name, prior).await?;
                self.create(type_name, config).await
            }
            result => result,
        }
    }

    pub async fn delete(&self, type_name: &str, mut state: ResourceData) -> Result<()> {
        let resource = self.registry.resource(type_name)?;
        let id = state.require_id()?.to_string();

        resource
            .delete(&self.context, &mut state)
            .instrument(resource_span!(type_name, "delete", id = id))
            .await
            .map_err(|e| e.with_context(format!("{} delete", type_name)))?;
        tracing::info!(resource_type = type_name, id = %id, "resource deleted");
        Ok(())
    }

    pub async fn import(&self, type_name: &str, id: &str) -> Result<ResourceData> {
        let resource = self.registry.resource(type_name)?;
        resource
            .import(&self.context, id)
            .instrument(resource_span!(type_name, "import", id = id))
            .await
    }

    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: Map<String, Value>,
    ) -> Result<ResourceData> {
        let data_source = self.registry.data_source(type_name)?;
        let schema = data_source.schema();
        schema.validate(&config)?;
        let mut config = config;
        schema.apply_defaults(&mut config);

        let mut data = ResourceData::new(config);
        data_source
            .read(&self.context, &mut data)
            .instrument(data_source_span!(type_name))
            .await?;
        Ok(data)
    }

    /// Apply several independent resources concurrently.
    ///
    /// Results come back in input order.
    pub async fn apply_all(
        &self,
        items: Vec<(String, Option<ResourceData>, Map<String, Value>)>,
    ) -> Vec<Result<ResourceData>> {
        let futures = items.into_iter().map(|(type_name, prior, config)| async move {
            self.apply(&type_name, prior, config).await
        });
        futures::future::join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryLogicalClient;
    use serde_json::json;

    fn provider() -> (Provider, Arc<InMemoryLogicalClient>) {
        let client = Arc::new(InMemoryLogicalClient::new());
        let provider = Provider::with_client(ProviderConfig::default(), client.clone())
            .with_locks(Arc::new(MutexRegistry::new()));
        (provider, client)
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_registry_lists_types() {
        let registry = ResourceRegistry::builtin();
        assert!(registry.resource_types().contains(&"vault_policy"));
        assert!(registry.data_source_types().contains(&"vault_policy_document"));
        assert!(matches!(
            registry.resource("vault_nope"),
            Err(ProviderError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_plan_validates_before_any_request() {
        let (provider, client) = provider();
        let err = provider.plan("vault_policy", object(json!({"name": "dev"}))).unwrap_err();
        assert!(err.is_validation());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_force_new_requires_replacement() {
        let (provider, _client) = provider();
        let created = provider
            .create("vault_policy", object(json!({"name": "dev", "policy": "path \"a\" {}"})))
            .await
            .unwrap();

        let err = provider
            .update("vault_policy", created, object(json!({"name": "ops", "policy": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RequiresReplacement { ref attribute, .. } if attribute == "name"));
    }

    #[tokio::test]
    async fn test_apply_replaces_on_force_new_change() {
        let (provider, client) = provider();
        let created = provider
            .apply("vault_policy", None, object(json!({"name": "dev", "policy": "a"})))
            .await
            .unwrap();

        let replaced = provider
            .apply("vault_policy", Some(created), object(json!({"name": "ops", "policy": "a"})))
            .await
            .unwrap();

        assert_eq!(replaced.id(), Some("ops"));
        assert!(!client.contains("sys/policies/acl/dev"));
        assert!(client.contains("sys/policies/acl/ops"));
    }

    #[tokio::test]
    async fn test_server_errors_name_the_resource_operation() {
        let (provider, client) = provider();
        let created = provider
            .create("vault_mount", object(json!({"path": "kv", "type": "kv"})))
            .await
            .unwrap();
        client.remove("sys/mounts/kv");

        let err = provider
            .update("vault_mount", created, object(json!({"path": "kv", "type": "kv", "description": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err
            .to_string()
            .starts_with("vault_mount update: error writing to Vault at sys/mounts/kv/tune"));
    }

    #[tokio::test]
    async fn test_apply_all_keeps_order() {
        let (provider, _client) = provider();
        let results = provider
            .apply_all(vec![
                ("vault_policy".to_string(), None, object(json!({"name": "a", "policy": "1"}))),
                ("vault_nope".to_string(), None, Map::new()),
                ("vault_policy".to_string(), None, object(json!({"name": "b", "policy": "2"}))),
            ])
            .await;

        assert_eq!(results[0].as_ref().unwrap().id(), Some("a"));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().id(), Some("b"));
    }
}
