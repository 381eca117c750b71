//! In-memory [`LogicalClient`] used by tests and `--dry-run`.
//!
//! Paths are stored verbatim; LIST returns the immediate children of a prefix
//! the way Vault does (`child` for leaves, `child/` for deeper paths). Every
//! request is recorded so tests can assert on the exact calls a resource made.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Mutex;

use super::{LogicalClient, Secret};
use crate::errors::{ProviderError, Result};

/// One recorded request against the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Read(String),
    Write(String, Map<String, Value>),
    Delete(String),
    List(String),
}

/// Map-backed Vault stand-in.
#[derive(Debug, Default)]
pub struct InMemoryLogicalClient {
    entries: DashMap<String, Map<String, Value>>,
    requests: Mutex<Vec<Request>>,
}

impl InMemoryLogicalClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a path without recording a request.
    pub fn insert(&self, path: &str, data: Map<String, Value>) {
        self.entries.insert(normalize(path), data);
    }

    /// Current contents of a path, without recording a request.
    pub fn get(&self, path: &str) -> Option<Map<String, Value>> {
        self.entries.get(&normalize(path)).map(|entry| entry.value().clone())
    }

    /// Remove a path behind the provider's back (simulates out-of-band deletion).
    pub fn remove(&self, path: &str) {
        self.entries.remove(&normalize(path));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize(path))
    }

    /// Requests made so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Paths written so far, in order.
    pub fn writes(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Write(path, _) => Some(path),
                _ => None,
            })
            .collect()
    }

    fn record(&self, request: Request) -> Result<()> {
        self.requests
            .lock()
            .map_err(|_| ProviderError::internal("in-memory request log poisoned"))?
            .push(request);
        Ok(())
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

/// `sys/mounts/<p>` for a `sys/mounts/<p>/tune` path.
fn tuned_mount(path: &str) -> Option<&str> {
    path.strip_suffix("/tune").filter(|mount| mount.starts_with("sys/mounts/"))
}

/// Merge a tune body into a stored mount: TTLs go under `config`, the rest
/// replaces top-level fields.
fn apply_tune(mount: &mut Map<String, Value>, tune: Map<String, Value>) {
    for (key, value) in tune {
        if key.ends_with("_lease_ttl") {
            let config = mount.entry("config").or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(config) = config {
                config.insert(key, value);
            }
        } else {
            mount.insert(key, value);
        }
    }
}

#[async_trait]
impl LogicalClient for InMemoryLogicalClient {
    async fn read(&self, path: &str) -> Result<Option<Secret>> {
        let path = normalize(path);
        self.record(Request::Read(path.clone()))?;
        Ok(self.entries.get(&path).map(|entry| Secret::from_data(entry.value().clone())))
    }

    async fn write(&self, path: &str, data: Map<String, Value>) -> Result<Option<Secret>> {
        let path = normalize(path);
        self.record(Request::Write(path.clone(), data.clone()))?;
        if let Some(mount) = tuned_mount(&path) {
            let mut entry = self.entries.get_mut(mount).ok_or_else(|| {
                ProviderError::server(
                    format!("error writing to Vault at {}", path),
                    400,
                    vec![format!("no mount at {}", mount)],
                )
            })?;
            apply_tune(entry.value_mut(), data);
            return Ok(None);
        }
        self.entries.insert(path, data);
        Ok(None)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let path = normalize(path);
        self.record(Request::Delete(path.clone()))?;
        self.entries.remove(&path);
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Option<Secret>> {
        let prefix = format!("{}/", normalize(path));
        self.record(Request::List(normalize(path)))?;

        let keys: BTreeSet<String> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let rest = entry.key().strip_prefix(&prefix)?;
                Some(match rest.split_once('/') {
                    Some((child, _)) => format!("{}/", child),
                    None => rest.to_string(),
                })
            })
            .collect();

        if keys.is_empty() {
            return Ok(None);
        }

        let mut data = Map::new();
        data.insert("keys".to_string(), Value::from(keys.into_iter().collect::<Vec<_>>()));
        Ok(Some(Secret::from_data(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let client = InMemoryLogicalClient::new();
        client.write("/secret/app/", object(json!({"user": "svc"}))).await.unwrap();

        let secret = client.read("secret/app").await.unwrap().unwrap();
        assert_eq!(secret.get_str("user"), Some("svc"));
        assert_eq!(client.writes(), vec!["secret/app".to_string()]);
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let client = InMemoryLogicalClient::new();
        assert!(client.read("secret/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_immediate_children() {
        let client = InMemoryLogicalClient::new();
        client.insert("aws/roles/admin", Map::new());
        client.insert("aws/roles/deploy", Map::new());
        client.insert("aws/roles/team/nested", Map::new());
        client.insert("aws/config/root", Map::new());

        let listed = client.list("aws/roles").await.unwrap().unwrap();
        assert_eq!(listed.list_keys(), vec!["admin", "deploy", "team/"]);
        assert!(client.list("gcp/roleset").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tune_merges_into_mount() {
        let client = InMemoryLogicalClient::new();
        client.insert(
            "sys/mounts/kv",
            object(json!({"type": "kv", "description": "old", "config": {"default_lease_ttl": 60}})),
        );

        client
            .write("sys/mounts/kv/tune", object(json!({"description": "new", "max_lease_ttl": 7200})))
            .await
            .unwrap();

        assert!(!client.contains("sys/mounts/kv/tune"));
        assert_eq!(
            client.get("sys/mounts/kv").unwrap(),
            object(json!({
                "type": "kv",
                "description": "new",
                "config": {"default_lease_ttl": 60, "max_lease_ttl": 7200}
            }))
        );
        assert!(client.write("sys/mounts/none/tune", Map::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_records_request() {
        let client = InMemoryLogicalClient::new();
        client.insert("sys/policies/acl/dev", Map::new());
        client.delete("sys/policies/acl/dev").await.unwrap();

        assert!(!client.contains("sys/policies/acl/dev"));
        assert_eq!(client.requests(), vec![Request::Delete("sys/policies/acl/dev".to_string())]);
    }
}
