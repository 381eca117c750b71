//! `vault_policy`: an ACL policy stored at `sys/policies/acl/<name>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{from_response, to_body, Resource, ResourceData};
use crate::errors::Result;
use crate::provider::ProviderContext;
use crate::schema::{AttrType, Attribute, Schema};

#[derive(Debug, Clone, Copy, Default)]
pub struct AclPolicy;

#[derive(Debug, Deserialize)]
struct PolicyConfig {
    name: String,
    policy: String,
}

#[derive(Debug, Serialize)]
struct PolicyBody<'a> {
    policy: &'a str,
}

#[derive(Debug, Deserialize)]
struct PolicyResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    policy: String,
}

fn policy_path(name: &str) -> String {
    format!("sys/policies/acl/{}", name)
}

impl AclPolicy {
    async fn write(&self, ctx: &ProviderContext, data: &ResourceData) -> Result<String> {
        let config: PolicyConfig = data.decode()?;
        let path = policy_path(&config.name);
        tracing::debug!(path = %path, "writing policy");
        ctx.client.write(&path, to_body(&PolicyBody { policy: &config.policy })?).await?;
        Ok(config.name)
    }
}

#[async_trait]
impl Resource for AclPolicy {
    fn type_name(&self) -> &'static str {
        "vault_policy"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(
                Attribute::required("name", AttrType::String)
                    .force_new()
                    .describe("Name of the policy"),
            )
            .with_attribute(
                Attribute::required("policy", AttrType::String).describe("The policy document"),
            )
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let name = self.write(ctx, data).await?;
        data.set_id(name);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let name = data.require_id()?.to_string();
        let path = policy_path(&name);

        let Some(secret) = ctx.client.read(&path).await? else {
            tracing::warn!(path = %path, "policy not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        let response: PolicyResponse = from_response(secret, &path)?;
        data.set("name", response.name.unwrap_or(name));
        data.set("policy", response.policy);
        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        self.write(ctx, data).await?;
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = policy_path(data.require_id()?);
        tracing::debug!(path = %path, "deleting policy");
        ctx.client.delete(&path).await
    }
}
