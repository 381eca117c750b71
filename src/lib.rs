//! # vault-provider
//!
//! Typed resource management for HashiCorp Vault, in the shape of an
//! infrastructure-as-code provider: every resource type declares a schema and
//! maps Create/Read/Update/Delete onto Vault's logical API.
//!
//! ## Architecture
//!
//! ```text
//! CLI ──► Provider ──► ResourceRegistry ──► Resource / DataSource
//!            │                                 ├─ policy  (HCL rendering)
//!            │                                 ├─ id      (composite ids)
//!            │                                 ├─ hash    (stable set keys)
//!            │                                 └─ mutex   (named locks)
//!            ▼
//!      LogicalClient ──► HttpLogicalClient ──► Vault REST API
//!                   └──► InMemoryLogicalClient
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use serde_json::json;
//! use vault_provider::{Provider, ProviderConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let provider = Provider::configure(ProviderConfig::from_env()?).await?;
//!     let config = json!({"name": "dev", "policy": "path \"secret/*\" { capabilities = [\"read\"] }"});
//!     let state = provider
//!         .create("vault_policy", config.as_object().cloned().unwrap_or_default())
//!         .await?;
//!     println!("created {:?}", state.id());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod data_sources;
pub mod errors;
pub mod hash;
pub mod id;
pub mod mutex;
pub mod observability;
pub mod policy;
pub mod provider;
pub mod resources;
pub mod schema;

// Re-export commonly used types and traits
pub use client::{HttpLogicalClient, InMemoryLogicalClient, LogicalClient, Secret};
pub use config::{ObservabilityConfig, ProviderConfig};
pub use errors::{ProviderError, Result};
pub use provider::{Provider, ProviderContext, ResourceRegistry};
pub use resources::{Resource, ResourceData};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
