//! # Data Sources
//!
//! Read-only lookups. A data source takes a configuration, computes or fetches
//! its outputs, and sets an id; nothing is created on the server.

pub mod generic_secret;
pub mod policy_document;

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::Result;
use crate::provider::ProviderContext;
use crate::resources::ResourceData;
use crate::schema::Schema;

pub use generic_secret::GenericSecretDataSource;
pub use policy_document::PolicyDocument;

#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Fill in computed attributes and the id.
    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;
}

pub fn builtin() -> Vec<Arc<dyn DataSource>> {
    vec![Arc::new(PolicyDocument), Arc::new(GenericSecretDataSource)]
}
