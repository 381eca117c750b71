//! `vault_generic_secret` data source: read any logical path.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::DataSource;
use crate::errors::{ProviderError, Result};
use crate::provider::ProviderContext;
use crate::resources::generic_secret::string_map;
use crate::resources::ResourceData;
use crate::schema::{AttrType, Attribute, Schema};

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericSecretDataSource;

#[derive(Debug, Deserialize)]
struct GenericSecretQuery {
    path: String,
}

#[async_trait]
impl DataSource for GenericSecretDataSource {
    fn type_name(&self) -> &'static str {
        "vault_generic_secret"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(Attribute::required("path", AttrType::String))
            .with_attribute(Attribute::computed("data_json", AttrType::String).sensitive())
            .with_attribute(Attribute::computed("data", AttrType::map(AttrType::String)).sensitive())
            .with_attribute(Attribute::computed("lease_id", AttrType::String))
            .with_attribute(Attribute::computed("lease_duration", AttrType::Number))
            .with_attribute(Attribute::computed("lease_renewable", AttrType::Bool))
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let query: GenericSecretQuery = data.decode()?;

        let secret = ctx
            .client
            .read(&query.path)
            .await?
            .ok_or_else(|| ProviderError::validation(format!("no secret found at {:?}", query.path)))?;

        let data_json = serde_json::to_string(&secret.data)?;
        data.set_id(query.path);
        data.set("data", Value::Object(string_map(&secret.data)));
        data.set("data_json", data_json);
        data.set("lease_id", secret.lease_id);
        data.set("lease_duration", secret.lease_duration);
        data.set("lease_renewable", secret.renewable);
        Ok(())
    }
}
