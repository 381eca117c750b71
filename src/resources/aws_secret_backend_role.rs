//! `vault_aws_secret_backend_role`: a role on an AWS secrets engine, stored at
//! `<backend>/roles/<name>` and identified by that same path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{from_response, to_body, trim_path, Resource, ResourceData};
use crate::errors::{ProviderError, Result};
use crate::id::ROLES;
use crate::provider::ProviderContext;
use crate::schema::{AttrType, Attribute, Schema};

const CREDENTIAL_TYPES: &[&str] = &["iam_user", "assumed_role", "federation_token", "session_token"];

#[derive(Debug, Clone, Copy, Default)]
pub struct AwsSecretBackendRole;

#[derive(Debug, Deserialize)]
struct AwsRoleConfig {
    backend: String,
    name: String,
    credential_type: String,
    #[serde(default)]
    role_arns: Vec<String>,
    #[serde(default)]
    policy_arns: Vec<String>,
    #[serde(default)]
    policy_document: Option<String>,
    #[serde(default)]
    iam_groups: Vec<String>,
    #[serde(default)]
    default_sts_ttl: Option<u64>,
    #[serde(default)]
    max_sts_ttl: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AwsRoleBody<'a> {
    credential_type: &'a str,
    role_arns: &'a [String],
    policy_arns: &'a [String],
    policy_document: Option<&'a str>,
    iam_groups: &'a [String],
    default_sts_ttl: Option<u64>,
    max_sts_ttl: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AwsRoleResponse {
    credential_type: Option<String>,
    credential_types: Vec<String>,
    role_arns: Vec<String>,
    policy_arns: Vec<String>,
    policy_document: String,
    iam_groups: Vec<String>,
    default_sts_ttl: u64,
    max_sts_ttl: u64,
}

impl AwsRoleConfig {
    fn validate(&self) -> Result<()> {
        if self.policy_arns.is_empty() && self.role_arns.is_empty() && self.policy_document.is_none() {
            return Err(ProviderError::validation(
                "at least one of policy_arns, role_arns or policy_document must be set",
            ));
        }
        if self.credential_type == "iam_user" && !self.role_arns.is_empty() {
            return Err(ProviderError::validation_field(
                "role_arns is not valid with credential_type iam_user",
                "role_arns",
            ));
        }
        Ok(())
    }
}

fn sorted(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values
}

impl AwsSecretBackendRole {
    async fn write(&self, ctx: &ProviderContext, config: &AwsRoleConfig) -> Result<String> {
        config.validate()?;
        let path = ROLES.encode(trim_path(&config.backend), &config.name)?;
        let body = AwsRoleBody {
            credential_type: &config.credential_type,
            role_arns: &config.role_arns,
            policy_arns: &config.policy_arns,
            policy_document: config.policy_document.as_deref(),
            iam_groups: &config.iam_groups,
            default_sts_ttl: config.default_sts_ttl,
            max_sts_ttl: config.max_sts_ttl,
        };
        tracing::debug!(path = %path, "writing AWS role");
        ctx.client.write(&path, to_body(&body)?).await?;
        Ok(path)
    }
}

#[async_trait]
impl Resource for AwsSecretBackendRole {
    fn type_name(&self) -> &'static str {
        "vault_aws_secret_backend_role"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(
                Attribute::required("backend", AttrType::String)
                    .force_new()
                    .describe("Path of the AWS secrets engine mount"),
            )
            .with_attribute(Attribute::required("name", AttrType::String).force_new())
            .with_attribute(
                Attribute::required("credential_type", AttrType::String).one_of(CREDENTIAL_TYPES),
            )
            .with_attribute(Attribute::optional("role_arns", AttrType::set(AttrType::String)))
            .with_attribute(Attribute::optional("policy_arns", AttrType::set(AttrType::String)))
            .with_attribute(Attribute::optional("policy_document", AttrType::String))
            .with_attribute(Attribute::optional("iam_groups", AttrType::set(AttrType::String)))
            .with_attribute(Attribute::optional_computed("default_sts_ttl", AttrType::Number))
            .with_attribute(Attribute::optional_computed("max_sts_ttl", AttrType::Number))
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: AwsRoleConfig = data.decode()?;
        let id = self.write(ctx, &config).await?;
        data.set_id(id);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = data.require_id()?.to_string();
        let (backend, name) = ROLES.decode(&path)?;

        let Some(secret) = ctx.client.read(&path).await? else {
            tracing::warn!(path = %path, "AWS role not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        let response: AwsRoleResponse = from_response(secret, &path)?;
        let credential_type = response
            .credential_type
            .or_else(|| response.credential_types.into_iter().next())
            .unwrap_or_default();

        data.set("backend", backend);
        data.set("name", name);
        data.set("credential_type", credential_type);
        data.set("role_arns", sorted(response.role_arns));
        data.set("policy_arns", sorted(response.policy_arns));
        data.set("iam_groups", sorted(response.iam_groups));
        if !response.policy_document.is_empty() {
            data.set("policy_document", response.policy_document);
        }
        data.set("default_sts_ttl", response.default_sts_ttl);
        data.set("max_sts_ttl", response.max_sts_ttl);
        Ok(())
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let config: AwsRoleConfig = data.decode()?;
        self.write(ctx, &config).await?;
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let path = data.require_id()?.to_string();
        ROLES.decode(&path)?;
        tracing::debug!(path = %path, "deleting AWS role");
        ctx.client.delete(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryLogicalClient;
    use crate::config::ProviderConfig;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_and_read() {
        let client = Arc::new(InMemoryLogicalClient::new());
        let ctx = ProviderContext::new(ProviderConfig::default(), client.clone());
        let mut data = ResourceData::new(
            json!({
                "backend": "aws",
                "name": "deploy",
                "credential_type": "assumed_role",
                "role_arns": ["arn:aws:iam::1:role/b", "arn:aws:iam::1:role/a"]
            })
            .as_object()
            .cloned()
            .unwrap(),
        );

        AwsSecretBackendRole.create(&ctx, &mut data).await.unwrap();
        assert_eq!(data.id(), Some("aws/roles/deploy"));
        assert_eq!(
            data.get("role_arns"),
            Some(&json!(["arn:aws:iam::1:role/a", "arn:aws:iam::1:role/b"]))
        );
        assert!(client.contains("aws/roles/deploy"));
    }

    #[tokio::test]
    async fn test_import_decodes_backend_and_name() {
        let client = Arc::new(InMemoryLogicalClient::new());
        client.insert(
            "team/aws/roles/admin",
            json!({"credential_types": ["iam_user"], "policy_arns": ["arn:p"]})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let ctx = ProviderContext::new(ProviderConfig::default(), client);

        let data = AwsSecretBackendRole.import(&ctx, "team/aws/roles/admin").await.unwrap();
        assert_eq!(data.get_str("backend"), Some("team/aws"));
        assert_eq!(data.get_str("name"), Some("admin"));
        assert_eq!(data.get_str("credential_type"), Some("iam_user"));
    }

    #[tokio::test]
    async fn test_malformed_id_fails_read() {
        let ctx = ProviderContext::new(ProviderConfig::default(), Arc::new(InMemoryLogicalClient::new()));
        let mut data = ResourceData::with_id("aws/deploy");
        let err = AwsSecretBackendRole.read(&ctx, &mut data).await.unwrap_err();
        assert!(err.to_string().contains("no backend/name found"));
    }

    #[test]
    fn test_requires_some_policy() {
        let config = AwsRoleConfig {
            backend: "aws".to_string(),
            name: "x".to_string(),
            credential_type: "iam_user".to_string(),
            role_arns: vec![],
            policy_arns: vec![],
            policy_document: None,
            iam_groups: vec![],
            default_sts_ttl: None,
            max_sts_ttl: None,
        };
        assert!(config.validate().is_err());
    }
}
