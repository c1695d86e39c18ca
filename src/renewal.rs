//! # Token Renewal Cycle
//!
//! Background loop keeping the Vault token alive for the lifetime of the
//! process:
//!
//! ```text
//! Armed (sleep 90% of lease) -> Renewing (renew-self) -> Armed ...
//! ```
//!
//! Each sleep is derived from the lease granted by the most recent renewal.
//! A failed renewal ends the cycle with an error; the supervisor treats it as
//! fatal. A token without a lease is never renewed.

use crate::credential::CredentialHandle;
use crate::cycle_span;
use crate::errors::Result;
use crate::lease::schedule;
use crate::vault::VaultGateway;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, Instrument};

/// Name of this cycle in log fields.
pub const CYCLE_NAME: &str = "token";

/// Keeps the shared credential renewed.
#[derive(Debug)]
pub struct TokenRenewalCycle {
    gateway: Arc<dyn VaultGateway>,
    credential: CredentialHandle,
    iteration: u64,
}

impl TokenRenewalCycle {
    pub fn new(gateway: Arc<dyn VaultGateway>, credential: CredentialHandle) -> Self {
        Self { gateway, credential, iteration: 0 }
    }

    /// Delay before the first renewal, from the lease known at bootstrap.
    ///
    /// Time spent since bootstrap is not subtracted.
    pub async fn initial_schedule(&self) -> Option<Duration> {
        schedule(self.credential.snapshot().await.lease_duration)
    }

    /// Perform one renewal and return the delay until the next one.
    ///
    /// `Ok(None)` means Vault granted no lease and renewal stops.
    pub async fn renew_once(&mut self) -> Result<Option<Duration>> {
        self.iteration += 1;

        let token = self.credential.token().await;
        let secret = self.gateway.renew_self(&token).await?;

        let lease = self.credential.apply(secret).await;
        let next = schedule(lease);

        info!(
            lease_seconds = lease.as_secs(),
            next_renewal_seconds = next.map(|d| d.as_secs()),
            "Renewed Vault token"
        );

        Ok(next)
    }

    /// Run until a renewal fails, or until the token turns out not to expire.
    pub async fn run(mut self) -> Result<()> {
        let mut next = self.initial_schedule().await;

        loop {
            let Some(delay) = next else {
                info!(cycle = CYCLE_NAME, "Token lease does not expire; renewal disabled");
                return Ok(());
            };

            debug!(cycle = CYCLE_NAME, delay_seconds = delay.as_secs(), "Token renewal armed");
            tokio::time::sleep(delay).await;

            let span = cycle_span!(CYCLE_NAME, self.iteration + 1);
            next = self.renew_once().instrument(span).await?;
        }
    }

    /// Number of renewals attempted so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }
}
