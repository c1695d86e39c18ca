//! Vault HTTP API adapter.
//!
//! Speaks the four endpoints the agent depends on directly over `reqwest`:
//!
//! | Operation     | Endpoint                               |
//! |---------------|----------------------------------------|
//! | `unwrap`      | `POST /v1/sys/wrapping/unwrap`         |
//! | `lookup_self` | `GET  /v1/auth/token/lookup-self`      |
//! | `renew_self`  | `POST /v1/auth/token/renew-self`       |
//! | `issue`       | `POST /v1/{mount}/issue/{role}`        |
//!
//! The typed responses of higher-level Vault crates drop the envelope
//! `lease_duration` of PKI issuance and cannot decode an unwrapped token
//! (whose payload lives in `auth`, not `data`), so the envelope is decoded here.

use super::error::{GatewayError, Result};
use super::gateway::VaultGateway;
use super::types::{CertificateBundle, IssuanceRequest, PkiPath, SecretString, TokenSecret};
use crate::config::VaultConfig;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Message Vault returns when asked to unwrap something that is not a
/// response-wrapping token.
const NOT_A_WRAPPING_TOKEN: &str = "wrapping token is not valid or does not exist";

/// Common envelope of every Vault API response.
#[derive(Debug, Deserialize)]
struct VaultResponse {
    #[serde(default)]
    lease_duration: u64,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    auth: Option<AuthBlock>,
}

#[derive(Debug, Deserialize)]
struct AuthBlock {
    client_token: SecretString,
    #[serde(default)]
    lease_duration: u64,
    #[serde(default)]
    renewable: bool,
}

impl From<AuthBlock> for TokenSecret {
    fn from(auth: AuthBlock) -> Self {
        Self {
            client_token: Some(auth.client_token),
            lease_duration: Duration::from_secs(auth.lease_duration),
            renewable: auth.renewable,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupData {
    #[serde(default)]
    ttl: u64,
    #[serde(default)]
    renewable: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Vault gateway backed by the HTTP API.
pub struct HttpVaultGateway {
    http: reqwest::Client,
    base_url: Url,
    namespace: Option<String>,
}

impl std::fmt::Debug for HttpVaultGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpVaultGateway")
            .field("base_url", &self.base_url.as_str())
            .field("namespace", &self.namespace)
            .field("http", &"[reqwest::Client]")
            .finish()
    }
}

impl HttpVaultGateway {
    /// Build a gateway from connection settings.
    ///
    /// Reads the CA bundle and client identity from disk when configured.
    pub fn new(config: &VaultConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION));

        if let Some(ca_path) = &config.ca_cert {
            let pem = std::fs::read(ca_path).map_err(|e| {
                GatewayError::config_error(format!(
                    "Failed to read CA certificate {}: {}",
                    ca_path.display(),
                    e
                ))
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                GatewayError::config_error(format!("Invalid CA certificate: {}", e))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        if let Some(ca_dir) = &config.ca_path {
            for certificate in load_ca_dir(ca_dir)? {
                builder = builder.add_root_certificate(certificate);
            }
        }

        match (&config.client_cert, &config.client_key) {
            (Some(cert_path), Some(key_path)) => {
                let mut pem = read_pem(cert_path)?;
                pem.push(b'\n');
                pem.extend(read_pem(key_path)?);
                let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                    GatewayError::config_error(format!("Invalid client certificate/key: {}", e))
                })?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => {
                return Err(GatewayError::config_error(
                    "VAULT_CLIENT_CERT and VAULT_CLIENT_KEY must be set together",
                ));
            }
        }

        if config.skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|e| {
            GatewayError::config_error(format!("Failed to build HTTP client: {}", e))
        })?;

        let mut base_url = config.address.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { http, base_url, namespace: config.namespace.clone() })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(&format!("v1/{}", path.trim_start_matches('/'))).map_err(|e| {
            GatewayError::config_error(format!("Invalid Vault path '{}': {}", path, e))
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        token: &SecretString,
        body: Option<&Value>,
    ) -> Result<(StatusCode, String)> {
        let url = self.endpoint(path)?;
        debug!(method = %method, path = %path, "Sending Vault request");

        let mut request =
            self.http.request(method, url).header(TOKEN_HEADER, token.expose_secret());
        if let Some(namespace) = &self.namespace {
            request = request.header(NAMESPACE_HEADER, namespace);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::connection_failed(format!("{}: {}", path, e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            GatewayError::malformed(path, format!("failed to read response body: {}", e))
        })?;

        Ok((status, text))
    }

    fn decode(path: &str, text: &str) -> Result<VaultResponse> {
        serde_json::from_str(text).map_err(|e| GatewayError::malformed(path, e.to_string()))
    }

    fn status_error(path: &str, status: StatusCode, text: &str) -> GatewayError {
        let errors = serde_json::from_str::<ErrorResponse>(text).unwrap_or_default().errors;
        let message = if errors.is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
            errors.join("; ")
        };
        GatewayError::status(path, status.as_u16(), message)
    }
}

/// Every certificate in the regular files of `dir`, in file name order.
///
/// A file without a single PEM certificate, or a directory without any, is a
/// configuration error.
fn load_ca_dir(dir: &Path) -> Result<Vec<reqwest::Certificate>> {
    let unreadable = |e: std::io::Error| {
        GatewayError::config_error(format!("Failed to read CA directory {}: {}", dir.display(), e))
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        if entry.file_type().map_err(unreadable)?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut certificates = Vec::new();
    for file in &files {
        let pem = read_pem(file)?;
        let found = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
            GatewayError::config_error(format!("Invalid CA certificate {}: {}", file.display(), e))
        })?;
        if found.is_empty() {
            return Err(GatewayError::config_error(format!(
                "No PEM certificate found in {}",
                file.display()
            )));
        }
        certificates.extend(found);
    }

    if certificates.is_empty() {
        return Err(GatewayError::config_error(format!(
            "CA directory {} contains no certificates",
            dir.display()
        )));
    }
    debug!(dir = %dir.display(), count = certificates.len(), "Loaded CA directory");
    Ok(certificates)
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        GatewayError::config_error(format!("Failed to read {}: {}", path.display(), e))
    })
}

#[async_trait]
impl VaultGateway for HttpVaultGateway {
    async fn unwrap(&self, token: &SecretString) -> Result<Option<TokenSecret>> {
        const PATH: &str = "sys/wrapping/unwrap";

        let (status, text) = self.send(Method::POST, PATH, token, None).await?;

        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND {
            debug!(status = status.as_u16(), "Token is not a wrapping token");
            return Ok(None);
        }

        if !status.is_success() {
            let err = Self::status_error(PATH, status, &text);
            if status == StatusCode::BAD_REQUEST && err.to_string().contains(NOT_A_WRAPPING_TOKEN)
            {
                debug!("Token is not a wrapping token");
                return Ok(None);
            }
            return Err(err);
        }

        let response = Self::decode(PATH, &text)?;
        match response.auth {
            Some(auth) => Ok(Some(auth.into())),
            None => Err(GatewayError::malformed(PATH, "unwrapped secret carries no auth block")),
        }
    }

    async fn lookup_self(&self, token: &SecretString) -> Result<TokenSecret> {
        const PATH: &str = "auth/token/lookup-self";

        let (status, text) = self.send(Method::GET, PATH, token, None).await?;
        if !status.is_success() {
            return Err(Self::status_error(PATH, status, &text));
        }

        let data = Self::decode(PATH, &text)?
            .data
            .ok_or_else(|| GatewayError::malformed(PATH, "response carries no data block"))?;
        let lookup: LookupData =
            serde_json::from_value(data).map_err(|e| GatewayError::malformed(PATH, e.to_string()))?;

        Ok(TokenSecret {
            client_token: None,
            lease_duration: Duration::from_secs(lookup.ttl),
            renewable: lookup.renewable,
        })
    }

    async fn renew_self(&self, token: &SecretString) -> Result<TokenSecret> {
        const PATH: &str = "auth/token/renew-self";

        let body = Value::Object(serde_json::Map::new());
        let (status, text) = self.send(Method::POST, PATH, token, Some(&body)).await?;
        if !status.is_success() {
            return Err(Self::status_error(PATH, status, &text));
        }

        Self::decode(PATH, &text)?
            .auth
            .map(TokenSecret::from)
            .ok_or_else(|| GatewayError::malformed(PATH, "response carries no auth block"))
    }

    async fn issue(
        &self,
        token: &SecretString,
        path: &PkiPath,
        request: &IssuanceRequest,
    ) -> Result<CertificateBundle> {
        let issue_path = path.issue_path();

        let body = serde_json::to_value(request)
            .map_err(|e| GatewayError::config_error(format!("Invalid issuance request: {}", e)))?;
        let (status, text) = self.send(Method::POST, &issue_path, token, Some(&body)).await?;
        if !status.is_success() {
            return Err(Self::status_error(&issue_path, status, &text));
        }

        let response = Self::decode(&issue_path, &text)?;
        let data = response
            .data
            .ok_or_else(|| GatewayError::malformed(&issue_path, "response carries no data block"))?;

        let string_field = |field: &'static str| -> Result<String> {
            data.get(field)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| GatewayError::missing_field(&issue_path, field))
        };

        let certificate = string_field("certificate")?;
        let issuing_ca = string_field("issuing_ca")?;
        let private_key = SecretString::new(string_field("private_key")?);

        let serial_number = data.get("serial_number").and_then(Value::as_str).map(str::to_owned);
        let expires_at = data
            .get("expiration")
            .and_then(Value::as_i64)
            .and_then(|ts| DateTime::from_timestamp(ts, 0));

        Ok(CertificateBundle {
            certificate,
            private_key,
            issuing_ca,
            lease_duration: Duration::from_secs(response.lease_duration),
            serial_number,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn self_signed_pem(name: &str) -> String {
        rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap().cert.pem()
    }

    fn config_with_ca_dir(dir: &Path) -> VaultConfig {
        VaultConfig {
            address: Url::parse("https://vault.internal:8200").unwrap(),
            namespace: None,
            ca_cert: None,
            ca_path: Some(dir.to_path_buf()),
            client_cert: None,
            client_key: None,
            skip_verify: false,
        }
    }

    #[test]
    fn test_ca_dir_loads_every_certificate() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("root.pem"), self_signed_pem("root.test")).unwrap();
        std::fs::write(
            dir.path().join("intermediates.crt"),
            format!("{}{}", self_signed_pem("a.test"), self_signed_pem("b.test")),
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        assert_eq!(load_ca_dir(dir.path()).unwrap().len(), 3);
        assert!(HttpVaultGateway::new(&config_with_ca_dir(dir.path())).is_ok());
    }

    #[test]
    fn test_ca_dir_rejects_non_pem_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("root.pem"), self_signed_pem("root.test")).unwrap();
        std::fs::write(dir.path().join("README"), "not a certificate").unwrap();

        let err = match load_ca_dir(dir.path()) {
            Err(e) => e,
            Ok(found) => panic!("expected an error, loaded {} certificates", found.len()),
        };

        assert!(matches!(err, GatewayError::ConfigError { .. }));
        assert!(err.to_string().contains("README"));
    }

    #[test]
    fn test_ca_dir_must_exist_and_hold_certificates() {
        let dir = TempDir::new().unwrap();

        assert!(load_ca_dir(dir.path()).is_err());
        assert!(load_ca_dir(&dir.path().join("missing")).is_err());
        assert!(HttpVaultGateway::new(&config_with_ca_dir(&dir.path().join("missing"))).is_err());
    }
}
