//! # Configuration Settings
//!
//! Defines the provider configuration and how it is layered:
//! defaults, then an optional TOML/YAML file, then `VAULT_PROVIDER_*`
//! variables, then the standard `VAULT_*` variables.

use crate::client::SecretString;
use crate::errors::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

/// Connection settings for the Vault server.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProviderConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200")
    #[validate(url(message = "Vault address must be a valid URL"))]
    pub address: String,

    /// Token sent as `X-Vault-Token`
    pub token: Option<SecretString>,

    /// Vault Enterprise namespace
    pub namespace: Option<String>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,

    /// Disable TLS certificate verification (development servers only)
    pub skip_tls_verify: bool,

    /// Skip the `sys/health` probe when configuring the provider
    pub skip_health_check: bool,

    /// Upper bound applied to lease TTLs requested by resources (0 = unbounded)
    pub max_lease_ttl_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            token: None,
            namespace: None,
            timeout_seconds: 60,
            skip_tls_verify: false,
            skip_health_check: false,
            max_lease_ttl_seconds: 0,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ProviderError::config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("VAULT_PROVIDER").try_parsing(true),
        );

        let mut config: ProviderConfig = builder.build()?.try_deserialize()?;
        config.apply_vault_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment only.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Overlay the variables the Vault CLI itself honours.
    fn apply_vault_env(&mut self) {
        if let Ok(address) = std::env::var("VAULT_ADDR") {
            self.address = address;
        }
        if let Ok(token) = std::env::var("VAULT_TOKEN") {
            self.token = Some(SecretString::new(token));
        }
        if let Ok(namespace) = std::env::var("VAULT_NAMESPACE") {
            self.namespace = Some(namespace);
        }
        if let Ok(skip) = std::env::var("VAULT_SKIP_VERIFY") {
            self.skip_tls_verify = skip.to_lowercase() == "true" || skip == "1";
        }
    }

    /// Validate field ranges and cross-field rules
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(ProviderError::from)?;

        if let Some(ref token) = self.token {
            if token.is_empty() {
                return Err(ProviderError::validation_field("token cannot be empty", "token"));
            }
        }

        Ok(())
    }

    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Clamp a requested lease TTL to `max_lease_ttl_seconds`.
    pub fn clamp_lease_ttl(&self, requested: u64) -> u64 {
        if self.max_lease_ttl_seconds == 0 || requested <= self.max_lease_ttl_seconds {
            return requested;
        }
        tracing::warn!(
            requested_ttl = requested,
            max_ttl = self.max_lease_ttl_seconds,
            "Lease TTL exceeds provider maximum, clamping"
        );
        self.max_lease_ttl_seconds
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Emit JSON lines instead of human-readable text
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logs: false }
    }
}

impl ObservabilityConfig {
    /// Create observability configuration from environment variables
    pub fn from_env() -> Self {
        let log_level =
            std::env::var("VAULT_PROVIDER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let json_logs = std::env::var("VAULT_PROVIDER_LOG_JSON")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(false);

        Self { log_level, json_logs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ProviderConfig::default();
        assert_eq!(config.address, "http://127.0.0.1:8200");
        assert_eq!(config.timeout_seconds, 60);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let config = ProviderConfig { timeout_seconds: 0, ..Default::default() };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Timeout must be between 1 and 300 seconds"));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let config = ProviderConfig { address: "vault".to_string(), ..Default::default() };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("valid URL"));
    }

    #[test]
    fn test_empty_token_rejected() {
        let config = ProviderConfig { token: Some(SecretString::new("")), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamp_lease_ttl() {
        let unbounded = ProviderConfig::default();
        assert_eq!(unbounded.clamp_lease_ttl(86400), 86400);

        let bounded = ProviderConfig { max_lease_ttl_seconds: 3600, ..Default::default() };
        assert_eq!(bounded.clamp_lease_ttl(60), 60);
        assert_eq!(bounded.clamp_lease_ttl(7200), 3600);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "address = \"https://vault.internal:8200\"\nnamespace = \"team-a\"\ntimeout_seconds = 15"
        )
        .unwrap();

        let config = ProviderConfig::load(Some(file.path())).unwrap();
        if std::env::var("VAULT_ADDR").is_err() {
            assert_eq!(config.address, "https://vault.internal:8200");
        }
        if std::env::var("VAULT_NAMESPACE").is_err() {
            assert_eq!(config.namespace.as_deref(), Some("team-a"));
        }
        assert_eq!(config.timeout_seconds, 15);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProviderConfig::load(Some(Path::new("/nonexistent/provider.toml"))).unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }

    #[test]
    fn test_observability_defaults() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }
}
