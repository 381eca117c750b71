//! HTTP implementation of [`LogicalClient`].
//!
//! Requests go to `<address>/v1/<path>` with the provider token in
//! `X-Vault-Token` and, when configured, the Enterprise namespace in
//! `X-Vault-Namespace`. LIST is sent as `GET ?list=true`, which Vault treats
//! identically to the `LIST` verb.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, trace};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};

use super::{LogicalClient, Secret, SecretString};
use crate::config::ProviderConfig;
use crate::errors::{ProviderError, Result};

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";
const REQUEST_HEADER: &str = "X-Vault-Request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Read,
    Write,
    Delete,
    List,
}

impl Operation {
    fn context(self, path: &str) -> String {
        match self {
            Operation::Read => format!("error reading from Vault at {}", path),
            Operation::Write => format!("error writing to Vault at {}", path),
            Operation::Delete => format!("error deleting from Vault at {}", path),
            Operation::List => format!("error listing from Vault at {}", path),
        }
    }

    /// Operations for which a 404 means "absent" rather than failure
    fn tolerates_not_found(self) -> bool {
        matches!(self, Operation::Read | Operation::List | Operation::Delete)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// Vault logical client over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpLogicalClient {
    client: Client,
    address: String,
    token: Option<SecretString>,
    namespace: Option<String>,
}

impl HttpLogicalClient {
    /// Build a client from provider configuration.
    ///
    /// No request is made; call [`HttpLogicalClient::check_health`] to verify
    /// the server is reachable.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        url::Url::parse(&config.address).map_err(|e| {
            ProviderError::config(format!("Invalid Vault address {:?}: {}", config.address, e))
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.skip_tls_verify)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            address: config.address.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            namespace: config.namespace.clone().filter(|ns| !ns.is_empty()),
        })
    }

    /// The server address requests are sent to
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Probe `sys/health` through `vaultrs` to fail fast on a bad address.
    pub async fn check_health(&self) -> Result<()> {
        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&self.address);

        if let Some(ref token) = self.token {
            settings_builder.token(token.expose_secret());
        }

        if let Some(ref namespace) = self.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            ProviderError::config(format!("Invalid Vault configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            ProviderError::config(format!("Failed to create Vault client: {}", e))
        })?;

        match vaultrs::sys::health(&client).await {
            Ok(_) => {
                info!(address = %self.address, "Successfully connected to Vault");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, address = %self.address, "Failed to connect to Vault");
                Err(ProviderError::config(format!("Vault health check failed: {}", e)))
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    fn authenticated(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder.header(REQUEST_HEADER, "true");
        if let Some(ref token) = self.token {
            builder = builder.header(TOKEN_HEADER, token.expose_secret());
        }
        if let Some(ref namespace) = self.namespace {
            builder = builder.header(NAMESPACE_HEADER, namespace);
        }
        builder
    }

    async fn send(&self, op: Operation, path: &str, builder: RequestBuilder) -> Result<Option<Secret>> {
        let response = self
            .authenticated(builder)
            .send()
            .await
            .map_err(|e| ProviderError::transport(op.context(path), e))?;

        parse_response(op, path, response).await
    }
}

async fn parse_response(op: Operation, path: &str, response: Response) -> Result<Option<Secret>> {
    let status = response.status();
    trace!(?op, path = %path, status = status.as_u16(), "Vault response");

    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    if status == StatusCode::NOT_FOUND && op.tolerates_not_found() {
        debug!(?op, path = %path, "Vault reported path as absent");
        return Ok(None);
    }

    let body = response.bytes().await.map_err(|e| ProviderError::transport(op.context(path), e))?;

    if !status.is_success() {
        let errors = match serde_json::from_slice::<ErrorBody>(&body) {
            Ok(parsed) => parsed.errors,
            Err(_) => {
                let text = String::from_utf8_lossy(&body).trim().to_string();
                if text.is_empty() {
                    vec![]
                } else {
                    vec![text]
                }
            }
        };
        return Err(ProviderError::server(op.context(path), status.as_u16(), errors));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let secret = serde_json::from_slice::<Secret>(&body)
        .map_err(|e| ProviderError::serialization(op.context(path), e))?;
    Ok(Some(secret))
}

#[async_trait]
impl LogicalClient for HttpLogicalClient {
    async fn read(&self, path: &str) -> Result<Option<Secret>> {
        debug!(path = %path, "GET");
        self.send(Operation::Read, path, self.client.get(self.url(path))).await
    }

    async fn write(&self, path: &str, data: Map<String, Value>) -> Result<Option<Secret>> {
        debug!(path = %path, fields = data.len(), "PUT");
        let builder = self.client.put(self.url(path)).json(&Value::Object(data));
        self.send(Operation::Write, path, builder).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        debug!(path = %path, "DELETE");
        self.send(Operation::Delete, path, self.client.delete(self.url(path))).await?;
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Option<Secret>> {
        debug!(path = %path, "LIST");
        let builder = self.client.get(self.url(path)).query(&[("list", "true")]);
        self.send(Operation::List, path, builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: &str) -> ProviderConfig {
        ProviderConfig {
            address: address.to_string(),
            token: Some(SecretString::new("hvs.test")),
            ..Default::default()
        }
    }

    #[test]
    fn test_url_joins_without_double_slashes() {
        let client = HttpLogicalClient::new(&config("http://127.0.0.1:8200/")).unwrap();
        assert_eq!(client.address(), "http://127.0.0.1:8200");
        assert_eq!(client.url("/sys/mounts"), "http://127.0.0.1:8200/v1/sys/mounts");
        assert_eq!(client.url("aws/roles/admin"), "http://127.0.0.1:8200/v1/aws/roles/admin");
    }

    #[test]
    fn test_invalid_address_rejected() {
        let err = HttpLogicalClient::new(&config("not a url")).unwrap_err();
        assert!(err.to_string().contains("Invalid Vault address"));
    }

    #[test]
    fn test_empty_namespace_ignored() {
        let mut cfg = config("http://127.0.0.1:8200");
        cfg.namespace = Some(String::new());
        let client = HttpLogicalClient::new(&cfg).unwrap();
        assert!(client.namespace.is_none());
    }

    #[test]
    fn test_operation_context_messages() {
        assert_eq!(Operation::Read.context("a/b"), "error reading from Vault at a/b");
        assert_eq!(Operation::Write.context("a/b"), "error writing to Vault at a/b");
        assert!(Operation::Delete.tolerates_not_found());
        assert!(!Operation::Write.tolerates_not_found());
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let client = HttpLogicalClient::new(&config("http://127.0.0.1:8200")).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("hvs.test"));
    }
}
