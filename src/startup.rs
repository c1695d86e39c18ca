//! Startup sequence and supervision of the two cycles.
//!
//! - Read the bootstrap token and resolve it into the shared credential
//! - Spawn the token renewal and certificate issuance cycles
//! - Wait until one of them fails, stop the other, and report the failure

use crate::bootstrap::resolve_credential;
use crate::config::{token_from_env, AgentConfig, VaultConfig};
use crate::credential::CredentialHandle;
use crate::errors::{AgentError, Result};
use crate::issuance::{BundleWriter, CertificateIssuanceCycle, HookCommand};
use crate::renewal::TokenRenewalCycle;
use crate::vault::{HttpVaultGateway, SecretString, VaultGateway};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tracing::info;

/// Run the agent against the Vault server described by the environment.
///
/// Only returns on a fatal error.
pub async fn run_agent(config: AgentConfig) -> Result<()> {
    config.validate()?;
    let vault = VaultConfig::from_env()?;
    let token = token_from_env()?;

    info!(
        vault_addr = %vault.address,
        namespace = vault.namespace.as_deref().unwrap_or(""),
        pki_path = %config.pki_path(),
        common_name = %config.common_name,
        "Starting certificate agent"
    );

    let gateway: Arc<dyn VaultGateway> = Arc::new(HttpVaultGateway::new(&vault)?);
    run_with_gateway(gateway, token, config).await
}

/// Bootstrap the credential through `gateway`, then supervise both cycles.
pub async fn run_with_gateway(
    gateway: Arc<dyn VaultGateway>,
    token: SecretString,
    config: AgentConfig,
) -> Result<()> {
    let credential = resolve_credential(gateway.as_ref(), token).await?;
    let (renewal, issuance) = build_cycles(gateway, credential, &config);
    supervise(renewal, issuance).await
}

fn build_cycles(
    gateway: Arc<dyn VaultGateway>,
    credential: CredentialHandle,
    config: &AgentConfig,
) -> (TokenRenewalCycle, CertificateIssuanceCycle) {
    let renewal = TokenRenewalCycle::new(gateway.clone(), credential.clone());
    let issuance = CertificateIssuanceCycle::new(
        gateway,
        credential,
        config.pki_path(),
        config.issuance_request(),
        BundleWriter::new(config.outputs.clone()),
    )
    .with_hook(HookCommand::from_config(config.hook_command.as_deref()));
    (renewal, issuance)
}

/// Run both cycles concurrently until one of them fails.
///
/// The token cycle finishing cleanly (a token that never expires) leaves the
/// issuance cycle running on its own. Returning drops the task set, which
/// aborts whichever cycle is still running.
pub async fn supervise(
    renewal: TokenRenewalCycle,
    issuance: CertificateIssuanceCycle,
) -> Result<()> {
    let mut cycles = JoinSet::new();
    let renewal_id = cycles.spawn(renewal.run()).id();
    cycles.spawn(issuance.run());

    loop {
        let Some(outcome) = cycles.join_next_with_id().await else {
            break Err(AgentError::task("no cycle left running"));
        };
        match outcome {
            Ok((id, Ok(()))) if id == renewal_id => {
                info!("Token renewal finished; supervising certificate issuance only");
            }
            Ok((_, Ok(()))) => {
                break Err(AgentError::task("certificate issuance stopped unexpectedly"));
            }
            Ok((_, Err(e))) => break Err(e),
            Err(e) => {
                let cycle =
                    if e.id() == renewal_id { "token renewal" } else { "certificate issuance" };
                break Err(join_failure(e, cycle));
            }
        }
    }
}

fn join_failure(e: JoinError, cycle: &str) -> AgentError {
    if e.is_panic() {
        AgentError::task(format!("{} task panicked", cycle))
    } else {
        AgentError::task(format!("{} task failed: {}", cycle, e))
    }
}
