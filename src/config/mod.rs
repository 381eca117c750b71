//! # Configuration Management
//!
//! Provider connection settings and logging configuration.

pub mod settings;

pub use settings::{ObservabilityConfig, ProviderConfig};
