//! Value types exchanged with Vault.
//!
//! Tokens and private keys are wrapped in [`SecretString`] so they cannot leak
//! through `Debug`, `Display`, or serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string wrapper that redacts its contents in Debug, Display, and serialization.
///
/// Memory is zeroed on drop. The value is only reachable through
/// [`SecretString::expose_secret`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(SecretString(value))
    }
}

impl SecretString {
    /// Creates a new SecretString from a string value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying secret value.
    ///
    /// Only call this where the raw value is required: request headers and
    /// the bytes written to the key file. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns the length of the secret without exposing the value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Token metadata returned by unwrap, lookup-self and renew-self.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSecret {
    /// Client token carried by the response.
    ///
    /// `None` for lookup-self, which describes the token already in hand
    /// rather than handing out a new one.
    pub client_token: Option<SecretString>,

    /// Lease granted to the token. Zero means the token does not expire.
    pub lease_duration: Duration,

    /// Whether Vault reports the token as renewable.
    pub renewable: bool,
}

/// PKI mount and role a certificate is issued against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkiPath {
    /// PKI secrets engine mount path (e.g., "pki")
    pub mount_path: String,

    /// Role name under the mount
    pub role_name: String,
}

impl PkiPath {
    pub fn new(mount_path: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self { mount_path: mount_path.into(), role_name: role_name.into() }
    }

    /// Logical path of the issue endpoint, `{mount}/issue/{role}`.
    pub fn issue_path(&self) -> String {
        format!(
            "{}/issue/{}",
            self.mount_path.trim_matches('/'),
            self.role_name.trim_matches('/')
        )
    }
}

impl fmt::Display for PkiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.issue_path())
    }
}

/// Parameters of a certificate issuance.
///
/// Built once from startup configuration and reused verbatim on every
/// iteration of the issuance cycle. Serializes to the Vault request body:
/// `common_name` and `ip_sans` are always present, `alt_names` and `ttl`
/// only when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuanceRequest {
    pub common_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_names: Option<String>,

    pub ip_sans: String,

    /// TTL override, rendered as whole seconds (`"3600s"`).
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_ttl")]
    pub ttl: Option<Duration>,
}

fn serialize_ttl<S>(ttl: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match ttl {
        Some(ttl) => serializer.serialize_str(&format!("{}s", ttl.as_secs())),
        None => serializer.serialize_none(),
    }
}

impl IssuanceRequest {
    pub fn new(common_name: impl Into<String>, ip_sans: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            alt_names: None,
            ip_sans: ip_sans.into(),
            ttl: None,
        }
    }

    pub fn with_alt_names(mut self, alt_names: impl Into<String>) -> Self {
        self.alt_names = Some(alt_names.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Certificate material returned by one issuance.
///
/// The three PEM fields are written to disk exactly as received.
#[derive(Clone)]
pub struct CertificateBundle {
    /// PEM-encoded X.509 certificate
    pub certificate: String,

    /// PEM-encoded private key (redacted in logs)
    pub private_key: SecretString,

    /// PEM-encoded issuing CA certificate
    pub issuing_ca: String,

    /// Lease granted with this issuance. Zero when Vault did not generate a lease.
    pub lease_duration: Duration,

    /// Serial number, when Vault reports it
    pub serial_number: Option<String>,

    /// Certificate expiration, when Vault reports it
    pub expires_at: Option<DateTime<Utc>>,
}

impl CertificateBundle {
    /// Lease to schedule the next issuance from.
    ///
    /// Vault's PKI engine reports `lease_duration = 0` unless the role
    /// generates leases; the certificate's own expiration stands in then.
    pub fn effective_lease(&self, now: DateTime<Utc>) -> Duration {
        if !self.lease_duration.is_zero() {
            return self.lease_duration;
        }

        self.expires_at
            .and_then(|expires_at| (expires_at - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }
}

impl fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("certificate", &format!("[{} bytes PEM]", self.certificate.len()))
            .field("private_key", &self.private_key)
            .field("issuing_ca", &format!("[{} bytes PEM]", self.issuing_ca.len()))
            .field("lease_duration", &self.lease_duration)
            .field("serial_number", &self.serial_number)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
