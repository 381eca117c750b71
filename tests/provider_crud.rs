//! Resource lifecycles through the provider against the in-memory client.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use vault_provider::client::memory::Request;
use vault_provider::mutex::MutexRegistry;
use vault_provider::{InMemoryLogicalClient, Provider, ProviderConfig, ProviderError};

fn provider() -> (Provider, Arc<InMemoryLogicalClient>) {
    let client = Arc::new(InMemoryLogicalClient::new());
    let provider = Provider::with_client(ProviderConfig::default(), client.clone())
        .with_locks(Arc::new(MutexRegistry::new()));
    (provider, client)
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_generic_secret_lifecycle() {
    let (provider, client) = provider();
    let config = object(json!({"path": "secret/app", "data_json": "{\"user\":\"u\",\"port\":5432}"}));

    let created = provider.create("vault_generic_secret", config).await.unwrap();
    assert_eq!(created.id(), Some("secret/app"));
    assert_eq!(created.get("data"), Some(&json!({"user": "u", "port": "5432"})));
    assert_eq!(created.get("disable_read"), Some(&json!(false)));

    let updated = provider
        .update(
            "vault_generic_secret",
            created,
            object(json!({"path": "secret/app", "data_json": "{\"user\":\"v\"}"})),
        )
        .await
        .unwrap();
    assert_eq!(client.get("secret/app").unwrap(), object(json!({"user": "v"})));
    assert_eq!(updated.get("data"), Some(&json!({"user": "v"})));

    provider.delete("vault_generic_secret", updated).await.unwrap();
    assert!(!client.contains("secret/app"));
}

#[tokio::test]
async fn test_update_without_data_change_skips_write() {
    let (provider, client) = provider();
    let config = object(json!({"path": "secret/app", "data_json": "{\"a\":\"1\"}"}));
    let created = provider.create("vault_generic_secret", config.clone()).await.unwrap();
    let writes_before = client.writes().len();

    provider.update("vault_generic_secret", created, config).await.unwrap();
    assert_eq!(client.writes().len(), writes_before);
}

#[tokio::test]
async fn test_drift_clears_id_and_apply_recreates() {
    let (provider, client) = provider();
    let config = object(json!({"name": "dev", "policy": "path \"a\" {}"}));
    let created = provider.apply("vault_policy", None, config.clone()).await.unwrap();

    client.remove("sys/policies/acl/dev");
    let refreshed = provider.read("vault_policy", created.clone()).await.unwrap();
    assert!(!refreshed.is_present());

    let recreated = provider.apply("vault_policy", Some(created), config).await.unwrap();
    assert_eq!(recreated.id(), Some("dev"));
    assert!(client.contains("sys/policies/acl/dev"));
}

#[tokio::test]
async fn test_import_existing_and_missing() {
    let (provider, client) = provider();
    client.insert("sys/policies/acl/ops", object(json!({"name": "ops", "policy": "x"})));

    let imported = provider.import("vault_policy", "ops").await.unwrap();
    assert_eq!(imported.get_str("policy"), Some("x"));

    let err = provider.import("vault_policy", "missing").await.unwrap_err();
    assert!(err.to_string().contains("cannot import non-existent remote object"));
}

#[tokio::test]
async fn test_aws_role_import_by_composite_id() {
    let (provider, client) = provider();
    client.insert(
        "aws/roles/deploy",
        object(json!({
            "credential_types": ["iam_user"],
            "policy_arns": ["arn:aws:iam::aws:policy/b", "arn:aws:iam::aws:policy/a"]
        })),
    );

    let imported = provider.import("vault_aws_secret_backend_role", "aws/roles/deploy").await.unwrap();
    assert_eq!(imported.get_str("backend"), Some("aws"));
    assert_eq!(imported.get_str("name"), Some("deploy"));
    assert_eq!(imported.get_str("credential_type"), Some("iam_user"));
    assert_eq!(
        imported.get("policy_arns"),
        Some(&json!(["arn:aws:iam::aws:policy/a", "arn:aws:iam::aws:policy/b"]))
    );

    let err = provider.import("vault_aws_secret_backend_role", "deploy").await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidId { .. }));
}

#[tokio::test]
async fn test_gcp_roleset_bindings_survive_refresh() {
    let (provider, _client) = provider();
    let config = object(json!({
        "backend": "gcp",
        "roleset": "ci",
        "project": "p",
        "secret_type": "service_account_key",
        "binding": [
            {"resource": "//cloudresourcemanager.googleapis.com/projects/p", "roles": ["roles/viewer"]},
            {"resource": "//cloudresourcemanager.googleapis.com/projects/p", "roles": ["roles/viewer"]}
        ]
    }));

    let created = provider.create("vault_gcp_secret_roleset", config).await.unwrap();
    assert_eq!(created.id(), Some("gcp/roleset/ci"));
    assert_eq!(created.get("binding").unwrap().as_array().unwrap().len(), 1);

    let refreshed = provider.read("vault_gcp_secret_roleset", created.clone()).await.unwrap();
    assert_eq!(refreshed.get("binding"), created.get("binding"));
}

#[tokio::test]
async fn test_oidc_key_with_allowed_client_ids() {
    let (provider, client) = provider();
    let key = provider
        .create("vault_identity_oidc_key", object(json!({"name": "signer"})))
        .await
        .unwrap();
    assert_eq!(key.get("algorithm"), Some(&json!("RS256")));

    let items = (0..4)
        .map(|i| {
            (
                "vault_identity_oidc_key_allowed_client_id".to_string(),
                None,
                object(json!({"key_name": "signer", "allowed_client_id": format!("app-{}", i)})),
            )
        })
        .collect();
    let results = provider.apply_all(items).await;
    assert!(results.iter().all(Result::is_ok));

    let stored = client.get("identity/oidc/key/signer").unwrap();
    assert_eq!(stored["allowed_client_ids"].as_array().unwrap().len(), 4);

    let first = results.into_iter().next().unwrap().unwrap();
    assert_eq!(first.id(), Some("signer/allowed-client-id/app-0"));
    provider.delete("vault_identity_oidc_key_allowed_client_id", first).await.unwrap();

    let stored = client.get("identity/oidc/key/signer").unwrap();
    assert!(!stored["allowed_client_ids"].as_array().unwrap().contains(&json!("app-0")));
}

#[tokio::test]
async fn test_mount_lifecycle() {
    let (provider, client) = provider();
    let created = provider
        .create(
            "vault_mount",
            object(json!({"path": "kv-team", "type": "kv", "default_lease_ttl_seconds": 3600})),
        )
        .await
        .unwrap();
    assert_eq!(created.id(), Some("kv-team"));
    assert_eq!(created.get("default_lease_ttl_seconds"), Some(&json!(3600)));

    provider.delete("vault_mount", created).await.unwrap();
    assert!(client.requests().contains(&Request::Delete("sys/mounts/kv-team".to_string())));
}

#[tokio::test]
async fn test_policy_document_data_source() {
    let (provider, client) = provider();
    let data = provider
        .read_data_source(
            "vault_policy_document",
            object(json!({"rule": [{
                "path": "secret/*",
                "capabilities": ["read", "list"],
                "description": "read secrets"
            }]})),
        )
        .await
        .unwrap();

    let hcl = data.get_str("hcl").unwrap();
    assert!(hcl.contains("# read secrets"));
    assert!(hcl.contains("path \"secret/*\" {"));
    assert!(hcl.contains("capabilities = [\"read\", \"list\"]"));
    assert!(data.id().is_some());
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_policy_document_rejects_bad_capability() {
    let (provider, _client) = provider();
    let err = provider
        .read_data_source(
            "vault_policy_document",
            object(json!({"rule": [{"path": "a", "capabilities": ["write"]}]})),
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_generic_secret_data_source() {
    let (provider, client) = provider();
    client.insert("secret/db", object(json!({"password": "p", "port": 5432})));

    let data = provider
        .read_data_source("vault_generic_secret", object(json!({"path": "secret/db"})))
        .await
        .unwrap();
    assert_eq!(data.get("data"), Some(&json!({"password": "p", "port": "5432"})));

    let err = provider
        .read_data_source("vault_generic_secret", object(json!({"path": "secret/none"})))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no secret found"));
}

#[tokio::test]
async fn test_unknown_types_are_rejected() {
    let (provider, _client) = provider();
    assert!(matches!(
        provider.create("vault_nope", Map::new()).await,
        Err(ProviderError::UnknownType { .. })
    ));
    assert!(matches!(
        provider.read_data_source("vault_nope", Map::new()).await,
        Err(ProviderError::UnknownType { .. })
    ));
}
