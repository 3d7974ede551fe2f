//! `ChainValidator.validate` (spec.md §4.7): order an unordered certificate
//! set into a chain, then check validity periods, signer key usage,
//! per-link signatures, and (if configured) termination at a trusted root.

use crate::error::Result;
use crate::x509::Certificate;

/// Options controlling [`ChainValidator::validate`].
pub struct ValidationOptions {
    pub now: chrono::DateTime<chrono::Utc>,
    pub check_validity_period: bool,
    /// SHA-256 fingerprints of accepted roots. Empty means "accept
    /// self-signed termination" (spec.md §4.7's fallback).
    pub trusted_roots: Vec<[u8; 32]>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            now: chrono::Utc::now(),
            check_validity_period: true,
            trusted_roots: Vec::new(),
        }
    }
}

/// The outcome of [`ChainValidator::validate`].
#[derive(Debug, Clone)]
pub struct ChainValidationResult {
    pub valid: bool,
    /// The chain in signer-to-root order, as reconstructed from the
    /// unordered input set.
    pub ordered_chain: Vec<Certificate>,
    pub errors: Vec<String>,
}

pub struct ChainValidator;

impl ChainValidator {
    pub fn validate(certs: &[Certificate], signer: &Certificate, options: &ValidationOptions) -> Result<ChainValidationResult> {
        let mut errors = Vec::new();
        let mut ordered = vec![signer.clone()];
        let mut remaining: Vec<Certificate> = certs
            .iter()
            .filter(|c| c.der() != signer.der())
            .cloned()
            .collect();

        loop {
            let current = ordered.last().expect("ordered always has at least the signer");
            if current.is_self_signed()? {
                break;
            }
            let issuer_dn = current.issuer_canonical()?;
            let pos = remaining
                .iter()
                .position(|c| c.subject_canonical().map(|s| s == issuer_dn).unwrap_or(false));
            match pos {
                Some(i) => ordered.push(remaining.remove(i)),
                None => break,
            }
        }

        if options.check_validity_period {
            for cert in &ordered {
                if !cert.is_valid_at(options.now)? {
                    errors.push(format!(
                        "certificate not valid at verification time: {}",
                        cert.subject_canonical().unwrap_or_default()
                    ));
                }
            }
        }

        if !signer.has_signing_usage()? {
            errors.push("signer certificate keyUsage does not permit digital signatures".to_string());
        }

        for i in 0..ordered.len() {
            if ordered[i].is_self_signed()? {
                continue;
            }
            if let Some(next) = ordered.get(i + 1) {
                if !ordered[i].verify_signed_by(next)? {
                    errors.push(format!(
                        "signature verification failed for certificate {}",
                        ordered[i].subject_canonical().unwrap_or_default()
                    ));
                }
            }
        }

        let last = ordered.last().expect("ordered always has at least the signer");
        if !options.trusted_roots.is_empty() {
            let fp = last.fingerprint_sha256();
            if !options.trusted_roots.iter().any(|r| *r == fp) {
                errors.push("chain does not terminate at a trusted root".to_string());
            }
        } else if !last.is_self_signed()? {
            errors.push("chain does not terminate at a self-signed root".to_string());
        }

        Ok(ChainValidationResult {
            valid: errors.is_empty(),
            ordered_chain: ordered,
            errors,
        })
    }
}
