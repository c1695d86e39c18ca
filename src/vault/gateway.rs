//! Gateway trait definition.
//!
//! The `VaultGateway` trait is the single point of contact with Vault. Both
//! renewal cycles and the bootstrap resolver are written against it, so the
//! HTTP adapter can be swapped for [`MockVaultGateway`](super::MockVaultGateway)
//! in tests.

use super::error::Result;
use super::types::{CertificateBundle, IssuanceRequest, PkiPath, SecretString, TokenSecret};
use async_trait::async_trait;

/// Operations the agent needs from Vault.
///
/// Every call carries the token to authenticate with explicitly; the gateway
/// holds no credential of its own. Implementations must not retry: a failure
/// is reported to the caller as-is.
#[async_trait]
pub trait VaultGateway: Send + Sync + std::fmt::Debug {
    /// Resolve a response-wrapping token into the secret it wraps.
    ///
    /// Returns `Ok(None)` when `token` is not a wrapping token. That is an
    /// expected outcome for agents started with a plain token, not an error.
    async fn unwrap(&self, token: &SecretString) -> Result<Option<TokenSecret>>;

    /// Look up lease metadata for `token`.
    ///
    /// The returned `client_token` is `None`; the token in hand stays live.
    async fn lookup_self(&self, token: &SecretString) -> Result<TokenSecret>;

    /// Extend the lease of `token`.
    async fn renew_self(&self, token: &SecretString) -> Result<TokenSecret>;

    /// Issue a certificate from the PKI role at `path`.
    ///
    /// # Errors
    ///
    /// - `GatewayError::Status` when Vault rejects the request (e.g. 403)
    /// - `GatewayError::MissingField` when `certificate`, `issuing_ca` or
    ///   `private_key` is absent or not a string
    async fn issue(
        &self,
        token: &SecretString,
        path: &PkiPath,
        request: &IssuanceRequest,
    ) -> Result<CertificateBundle>;
}
