//! # pades-core
//!
//! A PAdES-B-B / PAdES-B-T detached PDF signature core: the prepare →
//! pre-sign → finalize remote-signing workflow, plus an end-to-end
//! verifier, conforming to ETSI EN 319 142-1, RFC 5652 (CMS), RFC 5035
//! (ESS), RFC 3161 (TSP), and RFC 5280 (X.509).
//!
//! Private-key operations never happen here: `presign` returns the exact
//! bytes an external signer (smart card, HSM) must sign, and `finalize`
//! assembles the final container from the signature it returns. See
//! [`workflow`] for the four entry points, and the module list below for
//! the pipeline each one drives.
//!
//! ## Quick start
//!
//! ```ignore
//! use pades_core::config::Config;
//! use pades_core::workflow::{self, PrepareRequest, PresignRequest, FinalizeRequest};
//!
//! let cfg = Config::new("Dr. Test").with_reason("Testing");
//! let prepared = workflow::prepare(PrepareRequest { pdf_base64 }, &cfg)?;
//! let presigned = workflow::presign(PresignRequest {
//!     message_digest_b64: prepared.message_digest_b64.clone(),
//!     signer_cert_pem,
//! })?;
//! // ... hand `presigned.signed_attrs_der_b64` to the external signer ...
//! let finalized = workflow::finalize(FinalizeRequest { /* ... */ }, &cfg, &tsa_client, &chain_builder)?;
//! ```
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or the MIT
//! license, at your option.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod error;

pub mod codec;

pub mod asn1;
pub mod x509;

pub mod pdf;

pub mod attrs;
pub mod cms;
pub mod tsa;

pub mod chain;

pub mod verify;

pub mod report;
pub mod config;
pub mod workflow;

pub use config::Config;
pub use error::{Error, Result};
pub use report::VerificationReport;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with('0'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pades-core");
    }
}
