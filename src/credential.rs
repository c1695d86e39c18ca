//! The live Vault credential shared by both cycles.
//!
//! The token renewal cycle writes it, the certificate issuance cycle reads it.
//! Token and lease are replaced together under the write lock, and readers
//! take a snapshot under the read lock, so an issuance request can never
//! observe a renewal half-applied.

use crate::vault::{SecretString, TokenSecret};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Vault token plus the lease it was last granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: SecretString,
    pub lease_duration: Duration,
}

impl Credential {
    pub fn new(token: SecretString, lease_duration: Duration) -> Self {
        Self { token, lease_duration }
    }
}

/// Guarded holder of the single live [`Credential`].
///
/// Cloning the handle shares the credential; it does not copy it.
#[derive(Debug, Clone)]
pub struct CredentialHandle {
    inner: Arc<RwLock<Credential>>,
}

impl CredentialHandle {
    pub fn new(credential: Credential) -> Self {
        Self { inner: Arc::new(RwLock::new(credential)) }
    }

    /// Token to authenticate the next request with.
    pub async fn token(&self) -> SecretString {
        self.inner.read().await.token.clone()
    }

    /// Consistent copy of token and lease.
    pub async fn snapshot(&self) -> Credential {
        self.inner.read().await.clone()
    }

    /// Apply a renewal response.
    ///
    /// The lease is always replaced; the token only when Vault handed out a
    /// new one. Returns the lease now in effect.
    pub async fn apply(&self, secret: TokenSecret) -> Duration {
        let mut credential = self.inner.write().await;
        if let Some(token) = secret.client_token {
            credential.token = token;
        }
        credential.lease_duration = secret.lease_duration;
        credential.lease_duration
    }
}
