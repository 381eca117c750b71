//! # Resources
//!
//! A resource maps one kind of server object onto Create/Read/Update/Delete.
//! The life cycle of an instance:
//!
//! ```text
//! Unconfigured --create--> Present --read--> Present
//!                            |   \--read (not found)--> Unconfigured
//!                            |--update--> Present
//!                            \--delete--> Unconfigured
//! ```
//!
//! Every implementation decodes the loosely typed attribute map into its own
//! serde struct first, issues one request (occasionally two), and writes the
//! server's answer back into [`ResourceData`]. Read never fails on a missing
//! object; it clears the id instead so the object is planned for re-creation.

pub mod aws_secret_backend_role;
pub mod gcp_secret_roleset;
pub mod gcp_secret_static_account;
pub mod generic_secret;
pub mod identity_oidc_key;
pub mod identity_oidc_key_allowed_client_id;
pub mod mount;
pub mod policy;
pub mod transit_secret_cache_config;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::client::Secret;
use crate::errors::{ProviderError, Result};
use crate::provider::ProviderContext;
use crate::schema::Schema;

pub use aws_secret_backend_role::AwsSecretBackendRole;
pub use gcp_secret_roleset::GcpSecretRoleset;
pub use gcp_secret_static_account::GcpSecretStaticAccount;
pub use generic_secret::GenericSecret;
pub use identity_oidc_key::IdentityOidcKey;
pub use identity_oidc_key_allowed_client_id::IdentityOidcKeyAllowedClientId;
pub use mount::Mount;
pub use policy::AclPolicy;
pub use transit_secret_cache_config::TransitSecretCacheConfig;

/// State of one resource instance.
///
/// `id` is the only key that survives between runs; an instance without an
/// id is not present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    #[serde(default)]
    attributes: Map<String, Value>,

    /// Attributes before the update currently in progress
    #[serde(skip)]
    prior: Option<Map<String, Value>>,
}

impl ResourceData {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self { id: None, attributes, prior: None }
    }

    /// State for an import or refresh: only the id is known.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), ..Self::default() }
    }

    pub(crate) fn for_update(
        id: Option<String>,
        attributes: Map<String, Value>,
        prior: Map<String, Value>,
    ) -> Self {
        Self { id, attributes, prior: Some(prior) }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Id of a resource that must already exist
    pub fn require_id(&self) -> Result<&str> {
        self.id().ok_or_else(|| ProviderError::validation("resource has no id; it is not present in state"))
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Mark the instance as gone.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    pub fn is_present(&self) -> bool {
        self.id.is_some()
    }

    /// Attribute value; `null` counts as unset.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Whether `name` differs from the value before this update.
    /// Outside an update every attribute counts as changed.
    pub fn has_change(&self, name: &str) -> bool {
        match self.prior {
            Some(ref prior) => prior.get(name).filter(|v| !v.is_null()) != self.get(name),
            None => true,
        }
    }

    /// Decode the attributes into a resource's typed configuration.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.attributes.clone()))
            .map_err(|e| ProviderError::serialization("decoding resource attributes", e))
    }
}

/// CRUD functions of one resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Create the object and set the id. Implementations finish with a read.
    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;

    /// Refresh attributes from the server, clearing the id if the object is gone.
    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;

    /// Produce state for an existing object from its id.
    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<ResourceData> {
        let mut data = ResourceData::with_id(id);
        self.read(ctx, &mut data).await?;
        if !data.is_present() {
            return Err(ProviderError::validation(format!(
                "cannot import non-existent remote object {:?}",
                id
            )));
        }
        Ok(data)
    }
}

/// Built-in resources, in registration order.
pub fn builtin() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(AclPolicy),
        Arc::new(GenericSecret),
        Arc::new(Mount),
        Arc::new(AwsSecretBackendRole),
        Arc::new(GcpSecretRoleset),
        Arc::new(GcpSecretStaticAccount),
        Arc::new(IdentityOidcKey),
        Arc::new(IdentityOidcKeyAllowedClientId),
        Arc::new(TransitSecretCacheConfig),
    ]
}

/// Serialize a typed request body into the JSON object sent to Vault.
/// Unset optional fields are left out.
pub(crate) fn to_body<T: Serialize>(body: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(body)? {
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => Err(ProviderError::serialization(
            "building request body",
            format!("expected an object, got {}", other),
        )),
    }
}

/// Decode a response's `data` into a typed struct.
pub(crate) fn from_response<T: DeserializeOwned>(secret: Secret, path: &str) -> Result<T> {
    serde_json::from_value(Value::Object(secret.data))
        .map_err(|e| ProviderError::serialization(format!("decoding response from {}", path), e))
}

/// Vault returns TTLs either as integers or as duration strings like `"768h"`.
pub(crate) fn parse_ttl(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_duration(s),
        _ => None,
    }
}

fn parse_duration(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    if let Ok(seconds) = s.parse::<u64>() {
        return Some(seconds);
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let n: u64 = digits.parse().ok()?;
        digits.clear();
        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            'd' => 86400,
            _ => return None,
        };
        total = total.checked_add(n.checked_mul(unit)?)?;
    }
    if !digits.is_empty() {
        return None;
    }
    Some(total)
}

/// Trim leading and trailing slashes from a user-supplied mount path.
pub(crate) fn trim_path(path: &str) -> &str {
    path.trim_matches('/')
}
