//! # Observability Infrastructure
//!
//! Structured logging for provider operations. Spans are created with the
//! [`resource_span!`](crate::resource_span) and
//! [`data_source_span!`](crate::data_source_span) macros.

pub mod logging;

pub use logging::init_logging;
