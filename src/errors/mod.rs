//! # Error Handling
//!
//! Error taxonomy of the agent. Every variant is fatal: it travels up to the
//! supervisor and from there to `main`, which logs it and exits non-zero.

use crate::vault::GatewayError;
use std::path::PathBuf;

/// Custom result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Main error type for the agent
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    /// Missing or invalid startup value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any failure talking to Vault
    #[error("Vault error: {0}")]
    Backend(#[from] GatewayError),

    /// Writing one of the three output files failed
    #[error("Failed to write {kind} to {}: {source}", path.display())]
    Persist {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The post-issuance hook could not be launched or exited non-zero
    #[error("Hook command '{command}' failed: {message}")]
    Hook { command: String, message: String },

    /// A cycle task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),
}

impl AgentError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new persistence error
    pub fn persist(kind: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist { kind, path: path.into(), source }
    }

    /// Create a new hook error
    pub fn hook<C: Into<String>, M: Into<String>>(command: C, message: M) -> Self {
        Self::Hook { command: command.into(), message: message.into() }
    }

    /// Create a new task error
    pub fn task<S: Into<String>>(message: S) -> Self {
        Self::Task(message.into())
    }

    /// Short machine-readable category, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Backend(_) => "backend",
            Self::Persist { .. } => "persist",
            Self::Hook { .. } => "hook",
            Self::Task(_) => "task",
        }
    }
}
