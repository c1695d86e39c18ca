//! # Observability Infrastructure
//!
//! Structured logging for the agent. Spans and events carry the cycle name
//! and the relevant path or command as fields; secrets never appear in them.

pub mod logging;

pub use logging::{init_logging, log_fatal, LogFormat, ObservabilityConfig};
