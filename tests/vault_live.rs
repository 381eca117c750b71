//! Runs against the server named by `VAULT_ADDR`/`VAULT_TOKEN`.
//!
//! ```bash
//! vault server -dev -dev-root-token-id=root &
//! VAULT_ADDR=http://127.0.0.1:8200 VAULT_TOKEN=root cargo test --features vault_integration
//! ```

#![cfg(feature = "vault_integration")]

use serde_json::{json, Map, Value};
use vault_provider::{Provider, ProviderConfig};

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

async fn provider() -> Provider {
    let config = ProviderConfig::from_env().expect("VAULT_ADDR and VAULT_TOKEN must be set");
    Provider::configure(config).await.expect("Vault should be reachable")
}

#[tokio::test]
async fn test_policy_round_trip() {
    let provider = provider().await;
    let rendered = provider
        .read_data_source(
            "vault_policy_document",
            object(json!({"rule": [{"path": "secret/data/live-test/*", "capabilities": ["read"]}]})),
        )
        .await
        .unwrap();
    let hcl = rendered.get_str("hcl").unwrap().to_string();

    let created = provider
        .apply("vault_policy", None, object(json!({"name": "live-test", "policy": hcl})))
        .await
        .unwrap();
    assert_eq!(created.get_str("policy").map(str::trim), Some(hcl.trim()));

    provider.delete("vault_policy", created.clone()).await.unwrap();
    let gone = provider.read("vault_policy", created).await.unwrap();
    assert!(!gone.is_present());
}

#[tokio::test]
async fn test_mount_and_oidc_key() {
    let provider = provider().await;
    let mount = provider
        .create(
            "vault_mount",
            object(json!({"path": "live-test-kv", "type": "kv", "max_lease_ttl_seconds": 7200})),
        )
        .await
        .unwrap();
    assert_eq!(mount.get("max_lease_ttl_seconds"), Some(&json!(7200)));
    provider.delete("vault_mount", mount).await.unwrap();

    let key = provider
        .create("vault_identity_oidc_key", object(json!({"name": "live-test"})))
        .await
        .unwrap();
    let client_id = provider
        .create(
            "vault_identity_oidc_key_allowed_client_id",
            object(json!({"key_name": "live-test", "allowed_client_id": "client-a"})),
        )
        .await
        .unwrap();
    assert_eq!(client_id.id(), Some("live-test/allowed-client-id/client-a"));

    provider.delete("vault_identity_oidc_key_allowed_client_id", client_id).await.unwrap();
    provider.delete("vault_identity_oidc_key", key).await.unwrap();
}
