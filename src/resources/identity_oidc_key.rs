//! `vault_identity_oidc_key`: a named signing key at `identity/oidc/key/<name>`.
//!
//! The `allowed_client_ids` list may also be edited one entry at a time by
//! `vault_identity_oidc_key_allowed_client_id`, so every write to a key runs
//! under the lock named after the key's path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{from_response, to_body, Resource, ResourceData};
use crate::errors::Result;
use crate::provider::ProviderContext;
use crate::schema::{AttrType, Attribute, Schema};

const ALGORITHMS: &[&str] = &["RS256", "RS384", "RS512", "ES256", "ES384", "ES512", "EdDSA"];

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityOidcKey;

pub(crate) fn key_path(name: &str) -> String {
    format!("identity/oidc/key/{}", name)
}

#[derive(Debug, Deserialize)]
struct OidcKeyConfig {
    name: String,
    rotation_period: u64,
    verification_ttl: u64,
    algorithm: String,
    #[serde(default)]
    allowed_client_ids: Option<Vec<String>>,
}

/// Key fields as both sent and returned by the server.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct OidcKeyFields {
    pub rotation_period: u64,
    pub verification_ttl: u64,
    pub algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_client_ids: Option<Vec<String>>,
}

impl IdentityOidcKey {
    /// Write the key. Unless `set_client_ids` is true, the server's current
    /// `allowed_client_ids` are kept; they are read under the key's lock so
    /// entries added by `vault_identity_oidc_key_allowed_client_id` survive.
    async fn write(
        &self,
        ctx: &ProviderContext,
        config: OidcKeyConfig,
        set_client_ids: bool,
    ) -> Result<String> {
        let path = key_path(&config.name);
        let _lock = ctx.locks.lock(&path).await;

        let allowed_client_ids = if set_client_ids {
            config.allowed_client_ids
        } else {
            match ctx.client.read(&path).await? {
                Some(secret) => from_response::<OidcKeyFields>(secret, &path)?.allowed_client_ids,
                None => config.allowed_client_ids,
            }
        };

        let body = OidcKeyFields {
            rotation_period: config.rotation_period,
            verification_ttl: config.verification_ttl,
            algorithm: config.algorithm,
            allowed_client_ids,
        };
        tracing::debug!(path = %path, "writing OIDC key");
        ctx.client.write(&path, to_body(&body)?).await?;
        Ok(config.name)
    }
}

#[async_trait]
impl Resource for IdentityOidcKey {
    fn type_name(&self) -> &'static str {
        "vault_identity_oidc_key"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(Attribute::required("name", AttrType::String).force_new())
            .with_attribute(
                Attribute::optional("rotation_period", AttrType::Number)
                    .with_default(Value::from(86400))
                    .describe("How often to generate a new signing key, in seconds"),
            )
            .with_attribute(
                Attribute::optional("verification_ttl", AttrType::Number)
                    .with_default(Value::from(86400))
                    .describe("How long a rotated public key stays available, in seconds"),
            )
            .with_attribute(
                Attribute::optional("algorithm", AttrType::String)
                    .with_default(Value::from("RS256"))
                    .one_of(ALGORITHMS),
            )
            .with_attribute(Attribute::optional_computed(
                "allowed_client_ids",
                AttrType::set(AttrType::String),
            ))
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let name = self.write(ctx, data.decode()?, true).await?;
        data.set_id(name);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let name = data.require_id()?.to_string();
        let path = key_path(&name);

        let Some(secret) = ctx.client.read(&path).await? else {
            tracing::warn!(path = %path, "OIDC key not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        let response: OidcKeyFields = from_response(secret, &path)?;
        let mut allowed = response.allowed_client_ids.unwrap_or_default();
        allowed.sort();

        data.set("name", name);
        data.set("rotation_period", response.rotation_period);
        data.set("verification_ttl", response.verification_ttl);
        data.set("algorithm", response.algorithm);
        data.set("allowed_client_ids", allowed);
        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let set_client_ids = data.has_change("allowed_client_ids");
        self.write(ctx, data.decode()?, set_client_ids).await?;
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = key_path(data.require_id()?);
        let _lock = ctx.locks.lock(&path).await;
        tracing::debug!(path = %path, "deleting OIDC key");
        ctx.client.delete(&path).await
    }
}
