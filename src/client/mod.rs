//! Logical client for the Vault REST API.
//!
//! Every resource in this crate talks to Vault through four generic verbs on
//! a logical path: read, write, delete and list. The [`LogicalClient`] trait is
//! the seam between the resource shims and the transport:
//!
//! - [`HttpLogicalClient`] speaks HTTP to a real server (`/v1/<path>`)
//! - [`InMemoryLogicalClient`] keeps paths in a map, for tests and dry runs
//!
//! # Not-found semantics
//!
//! `read` and `list` return `Ok(None)` when Vault reports the path as absent
//! (HTTP 404). Resources use this to clear their identifier during Read so the
//! object is re-created, rather than failing the operation.

pub mod http;
pub mod memory;
pub mod token;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Result;

pub use http::HttpLogicalClient;
pub use memory::InMemoryLogicalClient;
pub use token::SecretString;

/// Response wrapping information, present when the request asked for a wrapped response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WrapInfo {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub accessor: String,
    #[serde(default)]
    pub ttl: u64,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default)]
    pub creation_path: String,
}

/// The envelope Vault returns for logical requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Secret {
    #[serde(default)]
    pub request_id: String,

    #[serde(default)]
    pub lease_id: String,

    #[serde(default)]
    pub lease_duration: u64,

    #[serde(default)]
    pub renewable: bool,

    /// Payload of the response; `null` on the wire becomes an empty map
    #[serde(default, deserialize_with = "deserialize_data")]
    pub data: Map<String, Value>,

    #[serde(default)]
    pub warnings: Option<Vec<String>>,

    #[serde(default)]
    pub wrap_info: Option<WrapInfo>,
}

fn deserialize_data<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Secret {
    /// Build a response carrying only `data`.
    pub fn from_data(data: Map<String, Value>) -> Self {
        Self { data, ..Default::default() }
    }

    /// String value of a data field, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Keys returned by a LIST request (`data.keys`)
    pub fn list_keys(&self) -> Vec<String> {
        self.data
            .get("keys")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(|k| k.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

/// Generic verbs against Vault logical paths.
///
/// Implementations must be `Send + Sync`; the provider holds one behind an
/// `Arc<dyn LogicalClient>` and independent resources may use it concurrently.
#[async_trait]
pub trait LogicalClient: Send + Sync {
    /// Read a path. `Ok(None)` means the path does not exist.
    async fn read(&self, path: &str) -> Result<Option<Secret>>;

    /// Write a JSON object to a path. Some endpoints answer with a body
    /// (e.g. generated credentials), most answer `204 No Content`.
    async fn write(&self, path: &str, data: Map<String, Value>) -> Result<Option<Secret>>;

    /// Delete a path. Deleting an absent path is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// List keys under a path. `Ok(None)` means nothing is there.
    async fn list(&self, path: &str) -> Result<Option<Secret>>;
}
