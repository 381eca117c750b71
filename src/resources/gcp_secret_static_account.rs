//! `vault_gcp_secret_static_account`: an existing service account managed at
//! `<backend>/static-account/<name>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::gcp_secret_roleset::{binding_block, check_token_scopes, SECRET_TYPES};
use super::{from_response, to_body, trim_path, Resource, ResourceData};
use crate::errors::Result;
use crate::hash::{Binding, BindingSet};
use crate::id::STATIC_ACCOUNT;
use crate::provider::ProviderContext;
use crate::schema::{AttrType, Attribute, Schema};

#[derive(Debug, Clone, Copy, Default)]
pub struct GcpSecretStaticAccount;

#[derive(Debug, Deserialize)]
struct StaticAccountConfig {
    backend: String,
    static_account: String,
    service_account_email: String,
    secret_type: String,
    #[serde(default)]
    token_scopes: Vec<String>,
    #[serde(default)]
    binding: Vec<Binding>,
}

#[derive(Debug, Serialize)]
struct StaticAccountBody<'a> {
    secret_type: &'a str,
    service_account_email: &'a str,
    token_scopes: Option<&'a [String]>,
    bindings: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StaticAccountResponse {
    secret_type: String,
    service_account_email: String,
    service_account_project: String,
    token_scopes: Vec<String>,
    bindings: Value,
}

impl GcpSecretStaticAccount {
    /// `clear_bindings` sends an empty binding list instead of omitting it,
    /// so bindings removed from configuration are removed on the server too.
    async fn write(
        &self,
        ctx: &ProviderContext,
        config: &StaticAccountConfig,
        clear_bindings: bool,
    ) -> Result<String> {
        check_token_scopes(&config.secret_type, &config.token_scopes)?;
        let bindings: BindingSet = config.binding.iter().cloned().collect();

        let path = STATIC_ACCOUNT.encode(trim_path(&config.backend), &config.static_account)?;
        let body = StaticAccountBody {
            secret_type: &config.secret_type,
            service_account_email: &config.service_account_email,
            token_scopes: (config.secret_type == "access_token")
                .then_some(config.token_scopes.as_slice()),
            bindings: (clear_bindings || !bindings.is_empty()).then(|| bindings.render_hcl()),
        };
        tracing::debug!(path = %path, "writing GCP static account");
        ctx.client.write(&path, to_body(&body)?).await?;
        Ok(path)
    }
}

#[async_trait]
impl Resource for GcpSecretStaticAccount {
    fn type_name(&self) -> &'static str {
        "vault_gcp_secret_static_account"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(Attribute::required("backend", AttrType::String).force_new())
            .with_attribute(Attribute::required("static_account", AttrType::String).force_new())
            .with_attribute(
                Attribute::required("service_account_email", AttrType::String)
                    .force_new()
                    .describe("Email of the existing GCP service account"),
            )
            .with_attribute(
                Attribute::optional("secret_type", AttrType::String)
                    .with_default(Value::from("access_token"))
                    .one_of(SECRET_TYPES)
                    .force_new(),
            )
            .with_attribute(Attribute::optional("token_scopes", AttrType::set(AttrType::String)))
            .with_attribute(Attribute::optional("binding", binding_block()))
            .with_attribute(Attribute::computed("service_account_project", AttrType::String))
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: StaticAccountConfig = data.decode()?;
        let id = self.write(ctx, &config, false).await?;
        data.set_id(id);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = data.require_id()?.to_string();
        let (backend, name) = STATIC_ACCOUNT.decode(&path)?;

        let Some(secret) = ctx.client.read(&path).await? else {
            tracing::warn!(path = %path, "GCP static account not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        let response: StaticAccountResponse = from_response(secret, &path)?;
        let bindings = BindingSet::from_response(&response.bindings)?;

        data.set("backend", backend);
        data.set("static_account", name);
        data.set("service_account_email", response.service_account_email);
        data.set("secret_type", response.secret_type);
        if !response.token_scopes.is_empty() {
            let mut scopes = response.token_scopes;
            scopes.sort();
            data.set("token_scopes", scopes);
        }
        if bindings.is_empty() {
            data.remove("binding");
        } else {
            data.set("binding", bindings.to_state());
        }
        if !response.service_account_project.is_empty() {
            data.set("service_account_project", response.service_account_project);
        }
        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: StaticAccountConfig = data.decode()?;
        self.write(ctx, &config, data.has_change("binding")).await?;
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = data.require_id()?.to_string();
        STATIC_ACCOUNT.decode(&path)?;
        tracing::debug!(path = %path, "deleting GCP static account");
        ctx.client.delete(&path).await
    }
}
