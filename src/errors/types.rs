//! # Error Types
//!
//! Error taxonomy for provider operations using `thiserror`.
//!
//! Validation errors are raised before any network call. Transport and server
//! errors carry the operation context ("error reading from Vault at ...") so
//! the message can be surfaced verbatim to the operator. A missing remote
//! object during Read is not an error at all: the resource's id is cleared.

/// Custom result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Main error type for the Vault provider
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid input rejected before any request is issued
    #[error("{}", format_validation(.message, .field))]
    Validation { message: String, field: Option<String> },

    /// A composite identifier that cannot be decoded
    #[error("Invalid ID {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    /// Connection-level failures talking to Vault
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// Vault answered with a non-success status code
    #[error("{context}: Code: {status}. Errors: {}", format_server_errors(.errors))]
    Server { context: String, status: u16, errors: Vec<String> },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}: {message}")]
    Serialization { context: String, message: String },

    /// The requested resource or data source type is not registered
    #[error("Unknown {kind} type: {type_name}")]
    UnknownType { kind: &'static str, type_name: String },

    /// A planned update touches an attribute that can only be set at creation
    #[error("Attribute {attribute:?} of {type_name} cannot be updated in place; the resource requires replacement")]
    RequiresReplacement { type_name: String, attribute: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn format_validation(message: &str, field: &Option<String>) -> String {
    match field {
        Some(field) => format!("Validation error for {}: {}", field, message),
        None => format!("Validation error: {}", message),
    }
}

fn format_server_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        return "none".to_string();
    }
    let items: Vec<String> = errors.iter().map(|e| format!("* {}", e)).collect();
    format!("\n\n{}", items.join("\n"))
}

impl ProviderError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an invalid identifier error
    pub fn invalid_id<I: Into<String>, R: Into<String>>(id: I, reason: R) -> Self {
        Self::InvalidId { id: id.into(), reason: reason.into() }
    }

    /// Wrap a transport failure with the operation that was attempted
    pub fn transport<S: Into<String>>(context: S, source: reqwest::Error) -> Self {
        Self::Transport { context: context.into(), source }
    }

    /// Create a server error from a status code and Vault's `errors` array
    pub fn server<S: Into<String>>(context: S, status: u16, errors: Vec<String>) -> Self {
        Self::Server { context: context.into(), status, errors }
    }

    /// Create a serialization error
    pub fn serialization<C: Into<String>, M: std::fmt::Display>(context: C, message: M) -> Self {
        Self::Serialization { context: context.into(), message: message.to_string() }
    }

    /// Create an unknown resource type error
    pub fn unknown_resource<S: Into<String>>(type_name: S) -> Self {
        Self::UnknownType { kind: "resource", type_name: type_name.into() }
    }

    /// Create an unknown data source type error
    pub fn unknown_data_source<S: Into<String>>(type_name: S) -> Self {
        Self::UnknownType { kind: "data source", type_name: type_name.into() }
    }

    /// Create a requires-replacement error
    pub fn requires_replacement<T: Into<String>, A: Into<String>>(type_name: T, attribute: A) -> Self {
        Self::RequiresReplacement { type_name: type_name.into(), attribute: attribute.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Prefix the error context with the resource operation that failed.
    ///
    /// Only variants that carry a context string are affected.
    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        let context = context.into();
        match &mut self {
            ProviderError::Transport { context: ctx, .. }
            | ProviderError::Server { context: ctx, .. }
            | ProviderError::Serialization { context: ctx, .. } => {
                *ctx = format!("{}: {}", context, ctx);
            }
            _ => {}
        }
        self
    }

    /// HTTP status reported by Vault, if the error came from the server
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error was raised before any network call was made
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ProviderError::Validation { .. }
                | ProviderError::InvalidId { .. }
                | ProviderError::RequiresReplacement { .. }
        )
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization("JSON serialization failed", error)
    }
}

impl From<serde_yaml::Error> for ProviderError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::serialization("YAML serialization failed", error)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        let context = match error.url() {
            Some(url) => format!("request to {} failed", url.path()),
            None => "request to Vault failed".to_string(),
        };
        Self::transport(context, error)
    }
}

impl From<config::ConfigError> for ProviderError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for ProviderError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        let message = fields
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
