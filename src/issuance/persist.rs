//! Writing the issued material to disk.
//!
//! Order is fixed: certificate, then issuing CA, then private key. Each file is
//! written in full to a staging sibling and renamed over the target, so a
//! failed write leaves the previous file untouched. The first failing write
//! aborts the rest, so nothing after it (including the hook) runs.

use crate::config::OutputPaths;
use crate::errors::{AgentError, Result};
use crate::vault::CertificateBundle;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Mode applied to files the agent creates.
#[cfg(unix)]
pub const FILE_MODE: u32 = 0o640;

/// Writes each bundle to the configured output paths.
#[derive(Debug, Clone)]
pub struct BundleWriter {
    paths: OutputPaths,
}

impl BundleWriter {
    pub fn new(paths: OutputPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Persist `bundle`, byte-for-byte as Vault returned it.
    pub async fn write(&self, bundle: &CertificateBundle) -> Result<()> {
        write_file("certificate", &self.paths.cert_file, bundle.certificate.as_bytes()).await?;
        write_file("ca", &self.paths.ca_file, bundle.issuing_ca.as_bytes()).await?;
        let key = bundle.private_key.expose_secret().as_bytes();
        write_file("private key", &self.paths.key_file, key).await?;
        Ok(())
    }
}

/// Sibling path each file is staged at before being renamed into place.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| OsStr::new("keepsake")));
    name.push(".tmp");
    path.with_file_name(name)
}

async fn write_file(kind: &'static str, path: &Path, contents: &[u8]) -> Result<()> {
    let staging = staging_path(path);
    let fail = |source: std::io::Error| AgentError::persist(kind, path, source);

    if let Err(e) = stage(&staging, contents).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(fail(e));
    }
    if let Err(e) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(fail(e));
    }

    debug!(file = %path.display(), bytes = contents.len(), "Wrote {}", kind);
    Ok(())
}

async fn stage(staging: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);

    let mut file = options.open(staging).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await
}
