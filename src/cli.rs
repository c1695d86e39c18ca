//! # Command Line Interface
//!
//! Every flag can also be supplied through a `KEEPSAKE_*` environment
//! variable. Vault connection settings come from the standard `VAULT_*`
//! variables instead and are listed in `--help`.

use crate::config::{
    parse_ttl, AgentConfig, OutputPaths, UNSUPPORTED_VAULT_ENVIRONMENT, VAULT_ENVIRONMENT,
};
use crate::observability::{LogFormat, ObservabilityConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

static AFTER_HELP: LazyLock<String> = LazyLock::new(|| {
    format!(
        "Vault connection is configured through: {}\nRejected at startup: {}",
        VAULT_ENVIRONMENT.join(", "),
        UNSUPPORTED_VAULT_ENVIRONMENT.join(", ")
    )
});

#[derive(Parser, Debug)]
#[command(name = "keepsake")]
#[command(about = "Keeps a Vault PKI certificate and its Vault token renewed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = AFTER_HELP.as_str())]
pub struct Cli {
    /// PKI secrets engine mount path
    #[arg(long, env = "KEEPSAKE_VAULT_PATH", default_value = "pki")]
    pub vault_path: String,

    /// PKI role to issue against
    #[arg(long, env = "KEEPSAKE_VAULT_ROLE", default_value = "server")]
    pub vault_role: String,

    /// Certificate common name
    #[arg(long = "cn", env = "KEEPSAKE_CN")]
    pub common_name: String,

    /// Comma separated DNS alternate names
    #[arg(long, env = "KEEPSAKE_ALT_NAMES")]
    pub alt_names: Option<String>,

    /// Comma separated IP SANs
    #[arg(long, env = "KEEPSAKE_IP_SANS", default_value = "127.0.0.1")]
    pub ip_sans: String,

    /// Requested certificate TTL (e.g. 72h, 1h30m); the role default applies when unset
    #[arg(long, alias = "certTTL", env = "KEEPSAKE_CERT_TTL", value_parser = parse_ttl)]
    pub cert_ttl: Option<Duration>,

    /// Where to write the certificate
    #[arg(long, alias = "certFile", env = "KEEPSAKE_CERT_FILE")]
    pub cert_file: PathBuf,

    /// Where to write the private key
    #[arg(long, alias = "keyFile", env = "KEEPSAKE_KEY_FILE")]
    pub key_file: PathBuf,

    /// Where to write the issuing CA
    #[arg(long, alias = "caFile", env = "KEEPSAKE_CA_FILE")]
    pub ca_file: PathBuf,

    /// Shell command to run after each issuance
    #[arg(long = "cmd", env = "KEEPSAKE_CMD")]
    pub hook_command: Option<String>,

    /// Log output format
    #[arg(long, env = "KEEPSAKE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Log level or filter directive; RUST_LOG takes precedence
    #[arg(long, env = "KEEPSAKE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Split into the agent configuration and the logging configuration.
    pub fn into_config(self) -> (AgentConfig, ObservabilityConfig) {
        let observability =
            ObservabilityConfig { log_level: self.log_level, log_format: self.log_format };

        let agent = AgentConfig {
            pki_mount: self.vault_path,
            pki_role: self.vault_role,
            common_name: self.common_name,
            alt_names: non_empty(self.alt_names),
            ip_sans: self.ip_sans,
            cert_ttl: self.cert_ttl,
            outputs: OutputPaths {
                cert_file: self.cert_file,
                key_file: self.key_file,
                ca_file: self.ca_file,
            },
            hook_command: non_empty(self.hook_command),
        };

        (agent, observability)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
