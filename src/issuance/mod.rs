//! # Certificate Issuance Cycle
//!
//! Background loop keeping a valid certificate on disk:
//!
//! ```text
//! Issuing -> Persisting (cert, CA, key) -> Hook -> Armed (sleep 90% of lease) -> Issuing ...
//! ```
//!
//! The first issuance happens as soon as the cycle starts. Every step is
//! fatal on failure; nothing is retried. Each iteration authenticates with
//! the credential as it stands at that moment, so renewals performed by the
//! token cycle are picked up without coordination.

pub mod cycle;
pub mod hook;
pub mod persist;

pub use cycle::{CertificateIssuanceCycle, CYCLE_NAME};
pub use hook::HookCommand;
pub use persist::BundleWriter;
