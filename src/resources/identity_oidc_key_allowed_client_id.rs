//! `vault_identity_oidc_key_allowed_client_id`: one entry of an OIDC key's
//! `allowed_client_ids`.
//!
//! The key itself is owned elsewhere, so create and delete are
//! read-modify-write cycles on the key, serialized by the key path's lock.
//! Identified as `<key>/allowed-client-id/<client_id>`.

use async_trait::async_trait;
use serde::Deserialize;

use super::identity_oidc_key::{key_path, OidcKeyFields};
use super::{from_response, to_body, Resource, ResourceData};
use crate::errors::{ProviderError, Result};
use crate::id::ALLOWED_CLIENT_ID;
use crate::provider::ProviderContext;
use crate::schema::{AttrType, Attribute, Schema};

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityOidcKeyAllowedClientId;

#[derive(Debug, Deserialize)]
struct AllowedClientIdConfig {
    key_name: String,
    allowed_client_id: String,
}

/// Apply `edit` to the key's client list and write the key back.
async fn modify_key<F>(ctx: &ProviderContext, key_name: &str, edit: F) -> Result<()>
where
    F: FnOnce(&mut Vec<String>) -> bool + Send,
{
    let path = key_path(key_name);
    let _lock = ctx.locks.lock(&path).await;

    let secret = ctx.client.read(&path).await?.ok_or_else(|| {
        ProviderError::validation_field(format!("OIDC key {:?} does not exist", key_name), "key_name")
    })?;
    let mut key: OidcKeyFields = from_response(secret, &path)?;
    let mut allowed = key.allowed_client_ids.take().unwrap_or_default();

    if !edit(&mut allowed) {
        tracing::debug!(path = %path, "allowed_client_ids unchanged");
        return Ok(());
    }

    key.allowed_client_ids = Some(allowed);
    ctx.client.write(&path, to_body(&key)?).await?;
    Ok(())
}

#[async_trait]
impl Resource for IdentityOidcKeyAllowedClientId {
    fn type_name(&self) -> &'static str {
        "vault_identity_oidc_key_allowed_client_id"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(
                Attribute::required("key_name", AttrType::String)
                    .force_new()
                    .describe("Name of the OIDC key"),
            )
            .with_attribute(
                Attribute::required("allowed_client_id", AttrType::String)
                    .force_new()
                    .describe("Client id allowed to use the key for signing"),
            )
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: AllowedClientIdConfig = data.decode()?;
        let id = ALLOWED_CLIENT_ID.encode(&config.key_name, &config.allowed_client_id)?;
        let client_id = config.allowed_client_id.clone();

        modify_key(ctx, &config.key_name, move |allowed| {
            if allowed.contains(&client_id) {
                return false;
            }
            allowed.push(client_id);
            true
        })
        .await?;

        data.set_id(id);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let id = data.require_id()?.to_string();
        let (key_name, client_id) = ALLOWED_CLIENT_ID.decode(&id)?;
        let path = key_path(&key_name);

        let Some(secret) = ctx.client.read(&path).await? else {
            tracing::warn!(path = %path, "OIDC key not found, removing client id from state");
            data.clear_id();
            return Ok(());
        };

        let key: OidcKeyFields = from_response(secret, &path)?;
        if !key.allowed_client_ids.unwrap_or_default().contains(&client_id) {
            tracing::warn!(path = %path, client_id = %client_id, "client id no longer allowed, removing from state");
            data.clear_id();
            return Ok(());
        }

        data.set("key_name", key_name);
        data.set("allowed_client_id", client_id);
        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        // every attribute forces replacement
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let (key_name, client_id) = ALLOWED_CLIENT_ID.decode(data.require_id()?)?;

        let result = modify_key(ctx, &key_name, move |allowed| {
            let before = allowed.len();
            allowed.retain(|c| c != &client_id);
            allowed.len() != before
        })
        .await;

        match result {
            // nothing left to remove from
            Err(ProviderError::Validation { .. }) => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryLogicalClient;
    use crate::config::ProviderConfig;
    use crate::mutex::MutexRegistry;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn setup() -> (ProviderContext, Arc<InMemoryLogicalClient>) {
        let client = Arc::new(InMemoryLogicalClient::new());
        client.insert(
            "identity/oidc/key/k",
            json!({"rotation_period": 3600, "verification_ttl": 3600, "algorithm": "RS256",
                   "allowed_client_ids": ["existing"]})
            .as_object()
            .cloned()
            .unwrap(),
        );
        let ctx = ProviderContext::new(ProviderConfig::default(), client.clone())
            .with_locks(Arc::new(MutexRegistry::new()));
        (ctx, client)
    }

    fn config(client_id: &str) -> ResourceData {
        ResourceData::new(
            json!({"key_name": "k", "allowed_client_id": client_id}).as_object().cloned().unwrap(),
        )
    }

    fn allowed(client: &InMemoryLogicalClient) -> Vec<Value> {
        client.get("identity/oidc/key/k").unwrap()["allowed_client_ids"]
            .as_array()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_appends_and_keeps_other_fields() {
        let (ctx, client) = setup();
        let mut data = config("app");
        IdentityOidcKeyAllowedClientId.create(&ctx, &mut data).await.unwrap();

        assert_eq!(data.id(), Some("k/allowed-client-id/app"));
        assert_eq!(allowed(&client), vec![json!("existing"), json!("app")]);
        assert_eq!(client.get("identity/oidc/key/k").unwrap()["rotation_period"], json!(3600));
    }

    #[tokio::test]
    async fn test_delete_removes_only_own_entry() {
        let (ctx, client) = setup();
        let mut data = config("app");
        IdentityOidcKeyAllowedClientId.create(&ctx, &mut data).await.unwrap();
        IdentityOidcKeyAllowedClientId.delete(&ctx, &mut data).await.unwrap();
        assert_eq!(allowed(&client), vec![json!("existing")]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_lose_nothing() {
        let (ctx, client) = setup();
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let mut data = config(&format!("client-{}", i));
                    IdentityOidcKeyAllowedClientId.create(&ctx, &mut data).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(allowed(&client).len(), 9);
    }

    #[tokio::test]
    async fn test_missing_key_fails_create() {
        let (ctx, _client) = setup();
        let mut data = ResourceData::new(
            json!({"key_name": "nope", "allowed_client_id": "a"}).as_object().cloned().unwrap(),
        );
        let err = IdentityOidcKeyAllowedClientId.create(&ctx, &mut data).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_read_clears_id_when_entry_removed() {
        let (ctx, client) = setup();
        let mut data = config("app");
        IdentityOidcKeyAllowedClientId.create(&ctx, &mut data).await.unwrap();

        let mut key = client.get("identity/oidc/key/k").unwrap();
        key.insert("allowed_client_ids".to_string(), json!(["existing"]));
        client.insert("identity/oidc/key/k", key);

        IdentityOidcKeyAllowedClientId.read(&ctx, &mut data).await.unwrap();
        assert!(!data.is_present());
    }
}
