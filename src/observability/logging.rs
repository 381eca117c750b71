//! # Structured Logging
//!
//! Subscriber setup and span macros for provider operations.
//!
//! Every CRUD call runs inside a `resource_operation` span carrying the
//! resource type, the operation and the resource id, so log lines emitted by
//! the HTTP client can be traced back to the resource that caused them.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::{ProviderError, Result};

/// Create a tracing span for a resource operation.
///
/// ```rust,ignore
/// let span = resource_span!("vault_policy", "create");
/// let span = resource_span!("vault_policy", "read", id = "dev");
/// ```
#[macro_export]
macro_rules! resource_span {
    ($type_name:expr, $operation:expr) => {
        tracing::info_span!(
            "resource_operation",
            resource_type = %$type_name,
            operation = %$operation,
            id = tracing::field::Empty
        )
    };
    ($type_name:expr, $operation:expr, id = $id:expr) => {
        tracing::info_span!(
            "resource_operation",
            resource_type = %$type_name,
            operation = %$operation,
            id = %$id
        )
    };
}

/// Create a tracing span for a data source read
#[macro_export]
macro_rules! data_source_span {
    ($type_name:expr) => {
        tracing::info_span!("data_source_read", data_source_type = %$type_name)
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.log_level`. Calling this twice returns an
/// error instead of panicking.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| ProviderError::config(format!("Invalid log filter: {}", e)))?;

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };

    result.map_err(|e| ProviderError::config(format!("Failed to initialise logging: {}", e)))
}
