//! # Vault Gateway
//!
//! Everything the agent says to Vault goes through the [`VaultGateway`] trait:
//!
//! - **unwrap**: resolve a response-wrapping token (or learn that it is not one)
//! - **lookup_self**: read the lease of the token in hand
//! - **renew_self**: extend the token lease
//! - **issue**: issue a certificate from a PKI role
//!
//! [`HttpVaultGateway`] is the production adapter; [`MockVaultGateway`] is a
//! scriptable stand-in for tests. Neither retries: every failure is handed
//! back to the calling cycle, which treats it as fatal.
//!
//! # Security Considerations
//!
//! - Tokens and private keys travel as [`SecretString`] and never reach logs
//! - The token is passed per call; the gateway keeps no credential state

pub mod client;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod types;

pub use client::HttpVaultGateway;
pub use error::{GatewayError, Result};
pub use gateway::VaultGateway;
pub use mock::{MockCall, MockVaultGateway};
pub use types::{CertificateBundle, IssuanceRequest, PkiPath, SecretString, TokenSecret};
