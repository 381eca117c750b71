//! `vault_transit_secret_cache_config`: key cache size of a transit engine.
//!
//! A new size only takes effect once the engine's plugin is reloaded, so every
//! write is followed by `sys/plugins/reload/backend` for that mount. There is
//! nothing to delete; removing the resource leaves the cache as it is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{from_response, to_body, trim_path, Resource, ResourceData};
use crate::errors::{ProviderError, Result};
use crate::provider::ProviderContext;
use crate::schema::{AttrType, Attribute, Schema};

const RELOAD_PATH: &str = "sys/plugins/reload/backend";

#[derive(Debug, Clone, Copy, Default)]
pub struct TransitSecretCacheConfig;

#[derive(Debug, Deserialize)]
struct CacheConfig {
    backend: String,
    size: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheBody {
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Serialize)]
struct ReloadBody<'a> {
    mounts: [&'a str; 1],
}

fn cache_path(backend: &str) -> String {
    format!("{}/cache-config", trim_path(backend))
}

impl TransitSecretCacheConfig {
    async fn write(&self, ctx: &ProviderContext, config: &CacheConfig) -> Result<String> {
        if config.size != 0 && config.size < 10 {
            return Err(ProviderError::validation_field(
                format!("cache size must be 0 (unlimited) or at least 10, got {}", config.size),
                "size",
            ));
        }

        let backend = trim_path(&config.backend);
        let path = cache_path(backend);
        tracing::debug!(path = %path, size = config.size, "writing transit cache size");
        ctx.client.write(&path, to_body(&CacheBody { size: config.size })?).await?;

        tracing::debug!(backend = %backend, "reloading transit plugin");
        ctx.client.write(RELOAD_PATH, to_body(&ReloadBody { mounts: [backend] })?).await?;
        Ok(backend.to_string())
    }
}

#[async_trait]
impl Resource for TransitSecretCacheConfig {
    fn type_name(&self) -> &'static str {
        "vault_transit_secret_cache_config"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(
                Attribute::required("backend", AttrType::String)
                    .force_new()
                    .describe("Path of the transit engine mount"),
            )
            .with_attribute(
                Attribute::required("size", AttrType::Number)
                    .describe("Number of cache entries; 0 means unlimited"),
            )
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: CacheConfig = data.decode()?;
        let backend = self.write(ctx, &config).await?;
        data.set_id(backend);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let backend = data.require_id()?.to_string();
        let path = cache_path(&backend);

        let Some(secret) = ctx.client.read(&path).await? else {
            tracing::warn!(path = %path, "transit cache config not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        let response: CacheBody = from_response(secret, &path)?;
        data.set("backend", backend);
        data.set("size", response.size);
        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: CacheConfig = data.decode()?;
        self.write(ctx, &config).await?;
        self.read(ctx, data).await
    }

    async fn delete(&self, _ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        tracing::debug!(
            backend = data.id().unwrap_or_default(),
            "transit cache config has no delete endpoint, leaving it in place"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::Request;
    use crate::client::InMemoryLogicalClient;
    use crate::config::ProviderConfig;
    use serde_json::json;
    use std::sync::Arc;

    fn data(size: u64) -> ResourceData {
        ResourceData::new(json!({"backend": "transit", "size": size}).as_object().cloned().unwrap())
    }

    #[tokio::test]
    async fn test_write_then_reload() {
        let client = Arc::new(InMemoryLogicalClient::new());
        let ctx = ProviderContext::new(ProviderConfig::default(), client.clone());
        let mut data = data(500);

        TransitSecretCacheConfig.create(&ctx, &mut data).await.unwrap();

        assert_eq!(data.id(), Some("transit"));
        assert_eq!(data.get("size"), Some(&json!(500)));
        assert_eq!(
            client.writes(),
            vec!["transit/cache-config".to_string(), RELOAD_PATH.to_string()]
        );
        assert_eq!(client.get(RELOAD_PATH).unwrap()["mounts"], json!(["transit"]));
    }

    #[tokio::test]
    async fn test_small_size_rejected_before_any_request() {
        let client = Arc::new(InMemoryLogicalClient::new());
        let ctx = ProviderContext::new(ProviderConfig::default(), client.clone());
        let err = TransitSecretCacheConfig.create(&ctx, &mut data(5)).await.unwrap_err();
        assert!(err.is_validation());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_a_no_op() {
        let client = Arc::new(InMemoryLogicalClient::new());
        let ctx = ProviderContext::new(ProviderConfig::default(), client.clone());
        let mut data = ResourceData::with_id("transit");
        TransitSecretCacheConfig.delete(&ctx, &mut data).await.unwrap();
        assert!(!client.requests().iter().any(|r| matches!(r, Request::Delete(_))));
    }
}
