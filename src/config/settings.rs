//! # Configuration Settings
//!
//! Defines the resolved configuration of the agent: what to issue, where to
//! write it, what to run afterwards, and how to reach Vault.

use crate::errors::{AgentError, Result};
use crate::vault::{IssuanceRequest, PkiPath, SecretString};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

/// Environment variable holding the Vault token (plain or response-wrapped).
pub const ENV_VAULT_TOKEN: &str = "VAULT_TOKEN";
pub const ENV_VAULT_ADDR: &str = "VAULT_ADDR";
pub const ENV_VAULT_NAMESPACE: &str = "VAULT_NAMESPACE";
pub const ENV_VAULT_CACERT: &str = "VAULT_CACERT";
pub const ENV_VAULT_CAPATH: &str = "VAULT_CAPATH";
pub const ENV_VAULT_CLIENT_CERT: &str = "VAULT_CLIENT_CERT";
pub const ENV_VAULT_CLIENT_KEY: &str = "VAULT_CLIENT_KEY";
pub const ENV_VAULT_SKIP_VERIFY: &str = "VAULT_SKIP_VERIFY";
pub const ENV_VAULT_TLS_SERVER_NAME: &str = "VAULT_TLS_SERVER_NAME";

/// Vault environment variables the agent honours, listed in `--help`.
pub const VAULT_ENVIRONMENT: &[&str] = &[
    ENV_VAULT_TOKEN,
    ENV_VAULT_ADDR,
    ENV_VAULT_NAMESPACE,
    ENV_VAULT_CACERT,
    ENV_VAULT_CAPATH,
    ENV_VAULT_CLIENT_CERT,
    ENV_VAULT_CLIENT_KEY,
    ENV_VAULT_SKIP_VERIFY,
];

/// Vault environment variables that are refused at startup instead of being
/// silently ignored.
pub const UNSUPPORTED_VAULT_ENVIRONMENT: &[&str] = &[ENV_VAULT_TLS_SERVER_NAME];

const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";

/// Main agent configuration
#[derive(Debug, Clone, Validate)]
pub struct AgentConfig {
    /// PKI secrets engine mount path
    #[validate(length(min = 1, message = "PKI mount path cannot be empty"))]
    pub pki_mount: String,

    /// PKI role name
    #[validate(length(min = 1, message = "PKI role cannot be empty"))]
    pub pki_role: String,

    /// Certificate common name
    #[validate(length(min = 1, message = "Certificate common name is required"))]
    pub common_name: String,

    /// Comma separated alternate names
    pub alt_names: Option<String>,

    /// Comma separated IP SANs, sent as given (empty for roles without IP SANs)
    pub ip_sans: String,

    /// TTL override sent with every issuance
    pub cert_ttl: Option<Duration>,

    /// Output paths for the issued material
    #[validate(nested)]
    pub outputs: OutputPaths,

    /// Shell command run after each successful issuance
    pub hook_command: Option<String>,
}

impl AgentConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(|e| AgentError::config(e.to_string()))
    }

    /// PKI mount and role certificates are issued from.
    pub fn pki_path(&self) -> PkiPath {
        PkiPath::new(&self.pki_mount, &self.pki_role)
    }

    /// The issuance request reused on every cycle iteration.
    pub fn issuance_request(&self) -> IssuanceRequest {
        let mut request = IssuanceRequest::new(&self.common_name, &self.ip_sans);
        if let Some(alt_names) = &self.alt_names {
            request = request.with_alt_names(alt_names);
        }
        if let Some(ttl) = self.cert_ttl {
            request = request.with_ttl(ttl);
        }
        request
    }
}

/// Where the three PEM artifacts are written
#[derive(Debug, Clone, Validate)]
pub struct OutputPaths {
    /// Certificate file
    #[validate(custom(function = "validate_output_path"))]
    pub cert_file: PathBuf,

    /// Private key file
    #[validate(custom(function = "validate_output_path"))]
    pub key_file: PathBuf,

    /// Issuing CA file
    #[validate(custom(function = "validate_output_path"))]
    pub ca_file: PathBuf,
}

fn validate_output_path(path: &PathBuf) -> std::result::Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        let mut error = ValidationError::new("empty_path");
        error.message = Some("Output file path cannot be empty".into());
        return Err(error);
    }
    Ok(())
}

/// Vault connection settings, read from the standard `VAULT_*` variables
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200")
    pub address: Url,

    /// Vault namespace (Enterprise)
    pub namespace: Option<String>,

    /// CA bundle used to verify the Vault server
    pub ca_cert: Option<PathBuf>,

    /// Directory of PEM CA certificates used to verify the Vault server
    pub ca_path: Option<PathBuf>,

    /// Client certificate for TLS authentication
    pub client_cert: Option<PathBuf>,

    /// Client key for TLS authentication
    pub client_key: Option<PathBuf>,

    /// Disable server certificate verification
    pub skip_verify: bool,
}

impl VaultConfig {
    /// Load Vault connection settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load Vault connection settings through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
        };

        let raw_address =
            non_empty(ENV_VAULT_ADDR).unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_string());
        let address = Url::parse(&raw_address).map_err(|e| {
            AgentError::config(format!("Invalid {} '{}': {}", ENV_VAULT_ADDR, raw_address, e))
        })?;
        if !matches!(address.scheme(), "http" | "https") {
            return Err(AgentError::config(format!(
                "{} must use http or https, got '{}'",
                ENV_VAULT_ADDR,
                address.scheme()
            )));
        }

        for key in UNSUPPORTED_VAULT_ENVIRONMENT {
            if non_empty(key).is_some() {
                return Err(AgentError::config(format!(
                    "{} is not supported; unset it and verify the server by its address",
                    key
                )));
            }
        }

        let skip_verify = match non_empty(ENV_VAULT_SKIP_VERIFY) {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                AgentError::config(format!("Invalid {} '{}'", ENV_VAULT_SKIP_VERIFY, value))
            })?,
            None => false,
        };

        Ok(Self {
            address,
            namespace: non_empty(ENV_VAULT_NAMESPACE),
            ca_cert: non_empty(ENV_VAULT_CACERT).map(PathBuf::from),
            ca_path: non_empty(ENV_VAULT_CAPATH).map(PathBuf::from),
            client_cert: non_empty(ENV_VAULT_CLIENT_CERT).map(PathBuf::from),
            client_key: non_empty(ENV_VAULT_CLIENT_KEY).map(PathBuf::from),
            skip_verify,
        })
    }
}

/// Read the bootstrap token from `VAULT_TOKEN`.
///
/// Absence is a configuration error, never retried.
pub fn token_from_env() -> Result<SecretString> {
    token_from_lookup(|key| std::env::var(key).ok())
}

pub fn token_from_lookup<F>(lookup: F) -> Result<SecretString>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(ENV_VAULT_TOKEN)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(SecretString::new)
        .ok_or_else(|| AgentError::config(format!("No token found in {}", ENV_VAULT_TOKEN)))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a certificate TTL.
///
/// Accepts bare seconds (`3600`) and unit durations, including compound
/// ones (`90s`, `72h`, `7d`, `1h30m`).
pub fn parse_ttl(value: &str) -> std::result::Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("TTL cannot be empty".to_string());
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        return value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("Invalid TTL '{}': {}", value, e));
    }

    let ttl = humantime::parse_duration(value)
        .map_err(|e| format!("Invalid TTL '{}': {}", value, e))?;
    if ttl.as_secs() == 0 {
        return Err(format!("TTL '{}' is shorter than one second", value));
    }
    Ok(ttl)
}
