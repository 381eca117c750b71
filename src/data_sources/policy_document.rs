//! `vault_policy_document`: renders `rule` blocks into policy HCL locally.

use async_trait::async_trait;
use serde::Deserialize;

use super::DataSource;
use crate::errors::Result;
use crate::hash::hash_string;
use crate::policy::{Policy, RuleConfig};
use crate::provider::ProviderContext;
use crate::resources::ResourceData;
use crate::schema::{AttrType, Attribute, Schema};

#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyDocument;

#[derive(Debug, Deserialize)]
struct PolicyDocumentConfig {
    #[serde(default)]
    rule: Vec<RuleConfig>,
}

fn parameter_block() -> AttrType {
    AttrType::list(AttrType::Object(vec![
        Attribute::required("key", AttrType::String),
        Attribute::optional("value", AttrType::list(AttrType::String)),
    ]))
}

#[async_trait]
impl DataSource for PolicyDocument {
    fn type_name(&self) -> &'static str {
        "vault_policy_document"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(Attribute::optional(
                "rule",
                AttrType::list(AttrType::Object(vec![
                    Attribute::required("path", AttrType::String),
                    Attribute::optional("description", AttrType::String),
                    Attribute::required("capabilities", AttrType::list(AttrType::String)),
                    Attribute::optional("required_parameters", AttrType::list(AttrType::String)),
                    Attribute::optional("allowed_parameter", parameter_block()),
                    Attribute::optional("denied_parameter", parameter_block()),
                    Attribute::optional("min_wrapping_ttl", AttrType::String),
                    Attribute::optional("max_wrapping_ttl", AttrType::String),
                ])),
            ))
            .with_attribute(
                Attribute::computed("hcl", AttrType::String).describe("The rendered policy document"),
            )
    }

    async fn read(&self, _ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: PolicyDocumentConfig = data.decode()?;
        let policy = Policy::from_config(&config.rule)?;
        let hcl = policy.render();

        tracing::debug!(rules = policy.rules.len(), "rendered policy document");
        data.set_id(hash_string(&hcl).to_string());
        data.set("hcl", hcl);
        Ok(())
    }
}
