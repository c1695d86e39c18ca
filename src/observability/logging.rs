//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence over
//! the configured level so operators can raise verbosity per module without
//! touching flags.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::errors::{AgentError, Result};

/// Output format of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable, one event per line
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Default filter directive (trace, debug, info, warn, error)
    pub log_level: String,

    /// Line format
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), log_format: LogFormat::Text }
    }
}

impl ObservabilityConfig {
    /// Filter to install: `RUST_LOG` when set and valid, the configured level otherwise.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.log_level).map_err(|e| {
                AgentError::config(format!("Invalid log level '{}': {}", self.log_level, e))
            }),
        }
    }
}

/// Install the global subscriber.
///
/// A subscriber installed earlier (e.g. by a test harness) is left in place.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match config.log_format {
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if let Err(e) = installed {
        tracing::debug!(error = %e, "Logging already initialised");
    }
    Ok(())
}

/// Report the error that stops the agent.
///
/// This is the only place a fatal error is logged; the file path or hook
/// command it concerns is carried as its own field.
pub fn log_fatal(error: &AgentError) {
    match error {
        AgentError::Persist { path, .. } => tracing::error!(
            error = %error,
            kind = error.kind(),
            path = %path.display(),
            "Fatal error, exiting"
        ),
        AgentError::Hook { command, .. } => tracing::error!(
            error = %error,
            kind = error.kind(),
            command = %command,
            "Fatal error, exiting"
        ),
        _ => tracing::error!(error = %error, kind = error.kind(), "Fatal error, exiting"),
    }
}

/// Create the span wrapping one iteration of a renewal cycle.
///
/// ```rust,ignore
/// let span = cycle_span!("certificate", iteration);
/// ```
#[macro_export]
macro_rules! cycle_span {
    ($cycle:expr, $iteration:expr) => {
        tracing::info_span!("cycle", cycle = %$cycle, iteration = $iteration)
    };
    ($cycle:expr, $iteration:expr, $($field:tt)*) => {
        tracing::info_span!("cycle", cycle = %$cycle, iteration = $iteration, $($field)*)
    };
}
