//! `vault_generic_secret`: arbitrary JSON written to a logical path.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Resource, ResourceData};
use crate::errors::{ProviderError, Result};
use crate::provider::ProviderContext;
use crate::schema::{AttrType, Attribute, Schema};

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericSecret;

#[derive(Debug, Deserialize)]
struct GenericSecretConfig {
    path: String,
    data_json: String,
}

impl GenericSecretConfig {
    fn payload(&self) -> Result<Map<String, Value>> {
        match serde_json::from_str::<Value>(&self.data_json) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ProviderError::validation_field("must be a JSON object", "data_json")),
            Err(e) => Err(ProviderError::validation_field(format!("invalid JSON: {}", e), "data_json")),
        }
    }
}

/// Flatten a secret's values to strings, as the `data` attribute exposes them.
/// Non-string values are rendered as JSON.
pub fn string_map(data: &Map<String, Value>) -> Map<String, Value> {
    data.iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), Value::String(s))
        })
        .collect()
}

impl GenericSecret {
    async fn write(&self, ctx: &ProviderContext, config: &GenericSecretConfig) -> Result<()> {
        let payload = config.payload()?;
        tracing::debug!(path = %config.path, keys = payload.len(), "writing generic secret");
        ctx.client.write(&config.path, payload).await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for GenericSecret {
    fn type_name(&self) -> &'static str {
        "vault_generic_secret"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(
                Attribute::required("path", AttrType::String)
                    .force_new()
                    .describe("Full path where the generic secret will be written"),
            )
            .with_attribute(
                Attribute::required("data_json", AttrType::String)
                    .sensitive()
                    .describe("JSON-encoded secret data to write"),
            )
            .with_attribute(
                Attribute::optional("disable_read", AttrType::Bool)
                    .with_default(Value::Bool(false))
                    .describe("Do not read the secret back; drift will not be detected"),
            )
            .with_attribute(Attribute::computed("data", AttrType::map(AttrType::String)).sensitive())
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: GenericSecretConfig = data.decode()?;
        self.write(ctx, &config).await?;
        data.set_id(config.path);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = data.require_id()?.to_string();

        if data.get_bool("disable_read").unwrap_or(false) {
            tracing::debug!(path = %path, "disable_read is set, using configured data");
            if let Some(data_json) = data.get_str("data_json") {
                let payload: Map<String, Value> = serde_json::from_str(data_json)?;
                data.set("data", Value::Object(string_map(&payload)));
            }
            return Ok(());
        }

        let Some(secret) = ctx.client.read(&path).await? else {
            tracing::warn!(path = %path, "secret not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        data.set("path", path);
        data.set("data_json", serde_json::to_string(&secret.data)?);
        data.set("data", Value::Object(string_map(&secret.data)));
        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: GenericSecretConfig = data.decode()?;
        if data.has_change("data_json") {
            self.write(ctx, &config).await?;
        }
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = data.require_id()?.to_string();
        tracing::debug!(path = %path, "deleting generic secret");
        ctx.client.delete(&path).await
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<ResourceData> {
        let mut data = ResourceData::with_id(id);
        data.set("disable_read", false);
        self.read(ctx, &mut data).await?;
        if !data.is_present() {
            return Err(ProviderError::validation(format!("no secret found at {:?}", id)));
        }
        Ok(data)
    }
}
