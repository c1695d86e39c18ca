//! One-shot startup step turning the supplied token into the live credential.
//!
//! The supplied token may be a response-wrapping token. Unwrapping it yields
//! the real client token; when it is not a wrapper, the token is used as-is
//! and its remaining TTL is looked up instead.

use crate::credential::{Credential, CredentialHandle};
use crate::errors::{AgentError, Result};
use crate::vault::{GatewayError, SecretString, VaultGateway};
use tracing::info;

/// Resolve `token` into the credential both cycles start from.
///
/// Any failure is fatal: the agent cannot proceed without a valid token.
pub async fn resolve_credential(
    gateway: &dyn VaultGateway,
    token: SecretString,
) -> Result<CredentialHandle> {
    let unwrapped = gateway.unwrap(&token).await?;

    let credential = match unwrapped {
        Some(secret) => {
            let client_token = secret.client_token.ok_or_else(|| {
                AgentError::from(GatewayError::malformed(
                    "sys/wrapping/unwrap",
                    "unwrapped secret does not contain a client token",
                ))
            })?;
            info!(
                lease_seconds = secret.lease_duration.as_secs(),
                renewable = secret.renewable,
                "Unwrapped response-wrapping token"
            );
            Credential::new(client_token, secret.lease_duration)
        }
        None => {
            let lookup = gateway.lookup_self(&token).await?;
            info!(
                lease_seconds = lookup.lease_duration.as_secs(),
                renewable = lookup.renewable,
                "Using supplied token directly"
            );
            Credential::new(token, lookup.lease_duration)
        }
    };

    Ok(CredentialHandle::new(credential))
}
