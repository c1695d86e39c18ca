use super::hook::HookCommand;
use super::persist::BundleWriter;
use crate::credential::CredentialHandle;
use crate::cycle_span;
use crate::errors::Result;
use crate::lease::schedule;
use crate::vault::{IssuanceRequest, PkiPath, VaultGateway};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// Name of this cycle in log fields.
pub const CYCLE_NAME: &str = "certificate";

/// Issues, persists and re-issues the certificate.
#[derive(Debug)]
pub struct CertificateIssuanceCycle {
    gateway: Arc<dyn VaultGateway>,
    credential: CredentialHandle,
    path: PkiPath,
    request: IssuanceRequest,
    writer: BundleWriter,
    hook: Option<HookCommand>,
    iteration: u64,
}

impl CertificateIssuanceCycle {
    pub fn new(
        gateway: Arc<dyn VaultGateway>,
        credential: CredentialHandle,
        path: PkiPath,
        request: IssuanceRequest,
        writer: BundleWriter,
    ) -> Self {
        Self { gateway, credential, path, request, writer, hook: None, iteration: 0 }
    }

    pub fn with_hook(mut self, hook: Option<HookCommand>) -> Self {
        self.hook = hook;
        self
    }

    /// Issue one certificate, write it out, run the hook.
    ///
    /// Returns the delay until the next issuance, or `None` when the bundle
    /// carries no lease at all.
    pub async fn issue_once(&mut self) -> Result<Option<Duration>> {
        self.iteration += 1;

        // Read at request time so a concurrent renewal is picked up.
        let token = self.credential.token().await;
        let bundle = self.gateway.issue(&token, &self.path, &self.request).await?;

        self.writer.write(&bundle).await?;

        let lease = bundle.effective_lease(Utc::now());
        info!(
            serial = bundle.serial_number.as_deref().unwrap_or("unknown"),
            common_name = %self.request.common_name,
            lease_seconds = lease.as_secs(),
            "Issued certificate"
        );

        if let Some(hook) = &self.hook {
            hook.run().await?;
        }

        Ok(schedule(lease))
    }

    /// Issue immediately, then again at 90% of each certificate lease.
    ///
    /// Only returns on failure.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let span = cycle_span!(CYCLE_NAME, self.iteration + 1);
            let next = self.issue_once().instrument(span).await?;

            match next {
                Some(delay) => {
                    debug!(
                        cycle = CYCLE_NAME,
                        delay_seconds = delay.as_secs(),
                        "Certificate issuance armed"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(cycle = CYCLE_NAME, "Certificate has no lease; it will not be reissued");
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    /// Number of issuances attempted so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputPaths;
    use crate::credential::Credential;
    use crate::errors::AgentError;
    use crate::vault::mock::{certificate_bundle, MockCall, MockVaultGateway};
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn outputs(dir: &TempDir) -> OutputPaths {
        OutputPaths {
            cert_file: dir.path().join("svc.crt"),
            key_file: dir.path().join("svc.key"),
            ca_file: dir.path().join("ca.crt"),
        }
    }

    fn cycle(mock: Arc<MockVaultGateway>, outputs: OutputPaths) -> CertificateIssuanceCycle {
        let credential =
            CredentialHandle::new(Credential::new("s.issuer".into(), Duration::from_secs(3600)));
        CertificateIssuanceCycle::new(
            mock,
            credential,
            PkiPath::new("pki", "server"),
            IssuanceRequest::new("svc.example.com", "127.0.0.1"),
            BundleWriter::new(outputs),
        )
    }

    #[tokio::test]
    async fn test_issue_once_writes_and_schedules() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockVaultGateway::new().with_issuance(certificate_bundle("a", 86400)));
        let mut cycle = cycle(mock.clone(), outputs(&dir));

        let next = cycle.issue_once().await.unwrap();

        assert_eq!(next, Some(Duration::from_secs(77760)));
        let cert = std::fs::read_to_string(dir.path().join("svc.crt")).unwrap();
        assert!(cert.contains("a-cert"));
        assert_eq!(
            mock.calls().await,
            vec![MockCall::Issue {
                token: "s.issuer".into(),
                path: "pki/issue/server".into(),
                request: IssuanceRequest::new("svc.example.com", "127.0.0.1"),
            }]
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn test_issue_failure_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("hook-ran");
        let mock =
            Arc::new(MockVaultGateway::new().with_issuance_failure(403, "permission denied"));
        let mut cycle = cycle(mock, outputs(&dir)).with_hook(Some(HookCommand::new(format!(
            "touch '{}'",
            marker.display()
        ))));

        let err = cycle.issue_once().await.unwrap_err();

        assert!(matches!(err, AgentError::Backend(_)));
        assert!(!dir.path().join("svc.crt").exists());
        assert!(!marker.exists());
        assert!(!logs_contain("ERROR"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hook_sees_all_three_files() {
        let dir = TempDir::new().unwrap();
        let paths = outputs(&dir);
        let marker = dir.path().join("hook-ran");
        let command = format!(
            "test -s '{}' && test -s '{}' && test -s '{}' && touch '{}'",
            paths.cert_file.display(),
            paths.ca_file.display(),
            paths.key_file.display(),
            marker.display()
        );
        let mock = Arc::new(MockVaultGateway::new().with_issuance(certificate_bundle("h", 600)));
        let mut cycle = cycle(mock, paths).with_hook(Some(HookCommand::new(command)));

        cycle.issue_once().await.unwrap();

        assert!(marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_persist_failure_skips_hook() {
        let dir = TempDir::new().unwrap();
        let mut paths = outputs(&dir);
        paths.key_file = dir.path().to_path_buf();
        let marker = dir.path().join("hook-ran");
        let mock = Arc::new(MockVaultGateway::new().with_issuance(certificate_bundle("p", 600)));
        let mut cycle = cycle(mock, paths)
            .with_hook(Some(HookCommand::new(format!("touch '{}'", marker.display()))));

        let err = cycle.issue_once().await.unwrap_err();

        assert_eq!(err.kind(), "persist");
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_issue_uses_renewed_token() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockVaultGateway::new().with_issuance(certificate_bundle("t", 60)));
        let credential =
            CredentialHandle::new(Credential::new("s.old".into(), Duration::from_secs(60)));
        let mut cycle = CertificateIssuanceCycle::new(
            mock.clone(),
            credential.clone(),
            PkiPath::new("pki", "server"),
            IssuanceRequest::new("svc.example.com", "127.0.0.1"),
            BundleWriter::new(outputs(&dir)),
        );

        credential.apply(crate::vault::mock::token_secret(Some("s.new"), 60)).await;
        cycle.issue_once().await.unwrap();

        match &mock.calls().await[0] {
            MockCall::Issue { token, .. } => assert_eq!(token, "s.new"),
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reissues_at_ninety_percent() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(
            MockVaultGateway::new()
                .with_issuance(certificate_bundle("one", 1000))
                .with_issuance(certificate_bundle("two", 1000)),
        );
        let task = tokio::spawn(cycle(mock.clone(), outputs(&dir)).run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(mock.issuance_count().await, 1);

        tokio::time::sleep(Duration::from_secs(898)).await;
        assert_eq!(mock.issuance_count().await, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(mock.issuance_count().await, 2);
        let cert = std::fs::read_to_string(dir.path().join("svc.crt")).unwrap();
        assert!(cert.contains("two-cert"));

        tokio::time::sleep(Duration::from_secs(900)).await;
        let result = task.await.unwrap();
        assert!(matches!(result, Err(AgentError::Backend(_))));
    }
}
