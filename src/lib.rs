//! # Keepsake
//!
//! Keepsake keeps a Vault PKI certificate on disk and keeps the Vault token
//! that issues it alive. Two independent lease clocks drive the process:
//!
//! ```text
//!                 bootstrap (unwrap / lookup-self)
//!                              |
//!                   shared credential (RwLock)
//!                 /                            \
//! token renewal cycle                    certificate issuance cycle
//! sleep 90% of token lease -> renew      issue -> write -> hook -> sleep 90% of cert lease
//! ```
//!
//! Any failure in either cycle is fatal. The process is meant to run under a
//! supervisor that restarts it.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use clap::Parser;
//! use keepsake::{cli::Cli, run_agent, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (config, _logging) = Cli::parse().into_config();
//!     run_agent(config).await
//! }
//! ```

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod credential;
pub mod errors;
pub mod issuance;
pub mod lease;
pub mod observability;
pub mod renewal;
pub mod startup;
pub mod vault;

// Re-export commonly used types
pub use config::AgentConfig;
pub use credential::{Credential, CredentialHandle};
pub use errors::{AgentError, Result};
pub use lease::{renewal_delay, schedule};
pub use startup::{run_agent, run_with_gateway, supervise};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
