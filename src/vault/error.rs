//! Error types for Vault gateway operations.

use thiserror::Error;

/// Result type for Vault gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while talking to Vault.
///
/// None of these are retried by the gateway. The caller decides what a
/// failure means; in this agent every one of them is fatal.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Failed to reach Vault (DNS, TCP, TLS, timeout).
    #[error("Vault connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Vault answered with a non-success status.
    #[error("Vault request to {path} failed with status {status}: {message}")]
    Status { path: String, status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Malformed Vault response from {path}: {message}")]
    MalformedResponse { path: String, message: String },

    /// A field the agent depends on was absent or had the wrong type.
    #[error("Vault response from {path} is missing string field '{field}'")]
    MissingField { path: String, field: &'static str },

    /// Client construction or request building failed.
    #[error("Vault client configuration error: {message}")]
    ConfigError { message: String },
}

impl GatewayError {
    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create a status error.
    pub fn status(path: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Status { path: path.into(), status, message: message.into() }
    }

    /// Create a malformed response error.
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse { path: path.into(), message: message.into() }
    }

    /// Create a missing field error.
    pub fn missing_field(path: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField { path: path.into(), field }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }

    /// HTTP status carried by this error, if Vault answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
