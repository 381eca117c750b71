//! `vault_gcp_secret_roleset`: a GCP roleset at `<backend>/roleset/<name>`.
//!
//! Bindings are a set attribute. They are sent as HCL `resource` blocks and
//! come back as a `{resource: [roles]}` object; state stores them in hash order
//! so that repeated reads compare equal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{from_response, to_body, trim_path, Resource, ResourceData};
use crate::errors::{ProviderError, Result};
use crate::hash::{Binding, BindingSet};
use crate::id::ROLESET;
use crate::provider::ProviderContext;
use crate::schema::{AttrType, Attribute, Schema};

pub(crate) const SECRET_TYPES: &[&str] = &["access_token", "service_account_key"];

/// Schema of a `binding` block, shared with static accounts.
pub(crate) fn binding_block() -> AttrType {
    AttrType::set(AttrType::Object(vec![
        Attribute::required("resource", AttrType::String),
        Attribute::required("roles", AttrType::set(AttrType::String)),
    ]))
}

/// Reject a secret type / scope combination the engine would refuse.
pub(crate) fn check_token_scopes(secret_type: &str, token_scopes: &[String]) -> Result<()> {
    if secret_type == "access_token" && token_scopes.is_empty() {
        return Err(ProviderError::validation_field(
            "token_scopes must be set when secret_type is access_token",
            "token_scopes",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GcpSecretRoleset;

#[derive(Debug, Deserialize)]
struct RolesetConfig {
    backend: String,
    roleset: String,
    project: String,
    secret_type: String,
    #[serde(default)]
    token_scopes: Vec<String>,
    #[serde(default)]
    binding: Vec<Binding>,
}

#[derive(Debug, Serialize)]
struct RolesetBody<'a> {
    secret_type: &'a str,
    project: &'a str,
    token_scopes: Option<&'a [String]>,
    bindings: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RolesetResponse {
    secret_type: String,
    project: String,
    service_account_email: String,
    token_scopes: Vec<String>,
    bindings: Value,
}

impl GcpSecretRoleset {
    async fn write(&self, ctx: &ProviderContext, config: &RolesetConfig) -> Result<String> {
        check_token_scopes(&config.secret_type, &config.token_scopes)?;
        let bindings: BindingSet = config.binding.iter().cloned().collect();
        if bindings.is_empty() {
            return Err(ProviderError::validation_field("at least one binding is required", "binding"));
        }

        let path = ROLESET.encode(trim_path(&config.backend), &config.roleset)?;
        let body = RolesetBody {
            secret_type: &config.secret_type,
            project: &config.project,
            token_scopes: (config.secret_type == "access_token").then_some(config.token_scopes.as_slice()),
            bindings: bindings.render_hcl(),
        };
        tracing::debug!(path = %path, bindings = bindings.len(), "writing GCP roleset");
        ctx.client.write(&path, to_body(&body)?).await?;
        Ok(path)
    }
}

#[async_trait]
impl Resource for GcpSecretRoleset {
    fn type_name(&self) -> &'static str {
        "vault_gcp_secret_roleset"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(Attribute::required("backend", AttrType::String).force_new())
            .with_attribute(
                Attribute::required("roleset", AttrType::String)
                    .force_new()
                    .describe("Name of the roleset"),
            )
            .with_attribute(Attribute::required("project", AttrType::String).force_new())
            .with_attribute(
                Attribute::optional("secret_type", AttrType::String)
                    .with_default(Value::from("access_token"))
                    .one_of(SECRET_TYPES)
                    .force_new(),
            )
            .with_attribute(Attribute::optional("token_scopes", AttrType::set(AttrType::String)))
            .with_attribute(Attribute::required("binding", binding_block()))
            .with_attribute(Attribute::computed("service_account_email", AttrType::String))
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: RolesetConfig = data.decode()?;
        let id = self.write(ctx, &config).await?;
        data.set_id(id);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = data.require_id()?.to_string();
        let (backend, roleset) = ROLESET.decode(&path)?;

        let Some(secret) = ctx.client.read(&path).await? else {
            tracing::warn!(path = %path, "GCP roleset not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        let response: RolesetResponse = from_response(secret, &path)?;
        let bindings = BindingSet::from_response(&response.bindings)?;

        data.set("backend", backend);
        data.set("roleset", roleset);
        data.set("project", response.project);
        data.set("secret_type", response.secret_type);
        if !response.token_scopes.is_empty() {
            let mut scopes = response.token_scopes;
            scopes.sort();
            data.set("token_scopes", scopes);
        }
        data.set("binding", bindings.to_state());
        if !response.service_account_email.is_empty() {
            data.set("service_account_email", response.service_account_email);
        }
        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: RolesetConfig = data.decode()?;
        self.write(ctx, &config).await?;
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = data.require_id()?.to_string();
        ROLESET.decode(&path)?;
        tracing::debug!(path = %path, "deleting GCP roleset");
        ctx.client.delete(&path).await
    }
}
