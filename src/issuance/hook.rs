//! Post-issuance hook: a shell command run after every successful write.

use crate::errors::{AgentError, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

const SHELL: &str = "/bin/sh";

/// Shell command run through `/bin/sh -c`.
///
/// The command inherits the agent's environment and standard streams, and
/// the cycle waits for it to exit before scheduling the next issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCommand {
    command: String,
}

impl HookCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }

    /// `None` for a missing or blank command.
    pub fn from_config(command: Option<&str>) -> Option<Self> {
        command.map(str::trim).filter(|c| !c.is_empty()).map(Self::new)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub async fn run(&self) -> Result<()> {
        let status = Command::new(SHELL)
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| AgentError::hook(&self.command, e.to_string()))?;

        if !status.success() {
            return Err(AgentError::hook(&self.command, status.to_string()));
        }

        info!(command = %self.command, "Hook completed");
        Ok(())
    }
}
