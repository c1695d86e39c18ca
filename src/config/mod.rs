//! # Configuration Management
//!
//! Startup configuration of the agent. Flags are parsed by [`crate::cli`];
//! Vault connection settings and the bootstrap token come from the standard
//! `VAULT_*` environment variables.

pub mod settings;

pub use settings::{
    parse_ttl, token_from_env, token_from_lookup, AgentConfig, OutputPaths, VaultConfig,
    ENV_VAULT_TOKEN, UNSUPPORTED_VAULT_ENVIRONMENT, VAULT_ENVIRONMENT,
};
