//! `vault_mount`: a secrets engine mounted at `sys/mounts/<path>`.
//!
//! Type, locality and seal wrapping are fixed at mount time. Description,
//! lease TTLs and options are changed through `sys/mounts/<path>/tune`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{from_response, parse_ttl, to_body, trim_path, Resource, ResourceData};
use crate::errors::Result;
use crate::provider::ProviderContext;
use crate::schema::{AttrType, Attribute, Schema};

#[derive(Debug, Clone, Copy, Default)]
pub struct Mount;

#[derive(Debug, Deserialize)]
struct MountConfig {
    path: String,
    #[serde(rename = "type")]
    engine_type: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default_lease_ttl_seconds: Option<u64>,
    #[serde(default)]
    max_lease_ttl_seconds: Option<u64>,
    #[serde(default)]
    options: Option<Map<String, Value>>,
    #[serde(default)]
    local: bool,
    #[serde(default)]
    seal_wrap: bool,
}

#[derive(Debug, Serialize)]
struct MountBody<'a> {
    #[serde(rename = "type")]
    engine_type: &'a str,
    description: Option<&'a str>,
    config: MountTtls,
    options: Option<&'a Map<String, Value>>,
    local: bool,
    seal_wrap: bool,
}

#[derive(Debug, Serialize)]
struct MountTtls {
    #[serde(skip_serializing_if = "Option::is_none")]
    default_lease_ttl: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_lease_ttl: Option<u64>,
}

#[derive(Debug, Serialize)]
struct TuneBody<'a> {
    description: Option<&'a str>,
    default_lease_ttl: Option<u64>,
    max_lease_ttl: Option<u64>,
    options: Option<&'a Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MountResponse {
    #[serde(rename = "type")]
    engine_type: String,
    description: String,
    accessor: String,
    config: Map<String, Value>,
    options: Option<Map<String, Value>>,
    local: bool,
    seal_wrap: bool,
}

fn mount_path(path: &str) -> String {
    format!("sys/mounts/{}", trim_path(path))
}

impl MountConfig {
    fn ttls(&self, ctx: &ProviderContext) -> (Option<u64>, Option<u64>) {
        (
            self.default_lease_ttl_seconds.map(|ttl| ctx.config.clamp_lease_ttl(ttl)),
            self.max_lease_ttl_seconds.map(|ttl| ctx.config.clamp_lease_ttl(ttl)),
        )
    }
}

#[async_trait]
impl Resource for Mount {
    fn type_name(&self) -> &'static str {
        "vault_mount"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(
                Attribute::required("path", AttrType::String)
                    .force_new()
                    .describe("Where the secrets engine is mounted"),
            )
            .with_attribute(
                Attribute::required("type", AttrType::String)
                    .force_new()
                    .describe("Type of the secrets engine, e.g. kv, transit, aws"),
            )
            .with_attribute(Attribute::optional("description", AttrType::String))
            .with_attribute(Attribute::optional_computed("default_lease_ttl_seconds", AttrType::Number))
            .with_attribute(Attribute::optional_computed("max_lease_ttl_seconds", AttrType::Number))
            .with_attribute(Attribute::optional("options", AttrType::map(AttrType::String)))
            .with_attribute(
                Attribute::optional("local", AttrType::Bool)
                    .with_default(Value::Bool(false))
                    .force_new(),
            )
            .with_attribute(
                Attribute::optional("seal_wrap", AttrType::Bool)
                    .with_default(Value::Bool(false))
                    .force_new(),
            )
            .with_attribute(Attribute::computed("accessor", AttrType::String))
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: MountConfig = data.decode()?;
        let (default_lease_ttl, max_lease_ttl) = config.ttls(ctx);
        let path = mount_path(&config.path);

        let body = MountBody {
            engine_type: &config.engine_type,
            description: config.description.as_deref(),
            config: MountTtls { default_lease_ttl, max_lease_ttl },
            options: config.options.as_ref(),
            local: config.local,
            seal_wrap: config.seal_wrap,
        };
        tracing::debug!(path = %path, engine = %config.engine_type, "mounting secrets engine");
        ctx.client.write(&path, to_body(&body)?).await?;

        data.set_id(trim_path(&config.path));
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let id = data.require_id()?.to_string();
        let path = mount_path(&id);

        let Some(secret) = ctx.client.read(&path).await? else {
            tracing::warn!(path = %path, "mount not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        let response: MountResponse = from_response(secret, &path)?;
        data.set("path", id);
        data.set("type", response.engine_type);
        if !response.description.is_empty() || data.get("description").is_some() {
            data.set("description", response.description);
        }
        if let Some(ttl) = response.config.get("default_lease_ttl").and_then(parse_ttl) {
            data.set("default_lease_ttl_seconds", ttl);
        }
        if let Some(ttl) = response.config.get("max_lease_ttl").and_then(parse_ttl) {
            data.set("max_lease_ttl_seconds", ttl);
        }
        if let Some(options) = response.options.filter(|o| !o.is_empty()) {
            data.set("options", Value::Object(options));
        }
        data.set("local", response.local);
        data.set("seal_wrap", response.seal_wrap);
        data.set("accessor", response.accessor);
        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: MountConfig = data.decode()?;
        let (default_lease_ttl, max_lease_ttl) = config.ttls(ctx);
        let path = format!("{}/tune", mount_path(data.require_id()?));

        let body = TuneBody {
            description: config.description.as_deref(),
            default_lease_ttl,
            max_lease_ttl,
            options: config.options.as_ref(),
        };
        tracing::debug!(path = %path, "tuning mount");
        ctx.client.write(&path, to_body(&body)?).await?;
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = mount_path(data.require_id()?);
        tracing::debug!(path = %path, "unmounting secrets engine");
        ctx.client.delete(&path).await
    }
}
