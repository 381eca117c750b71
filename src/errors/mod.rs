//! # Error Handling
//!
//! Error types for the Vault provider, defined with `thiserror`.

pub mod types;

pub use types::{ProviderError, Result};
