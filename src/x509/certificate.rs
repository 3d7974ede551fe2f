//! Owned X.509 certificate wrapper.
//!
//! `x509_parser::X509Certificate` borrows from the DER buffer it parses, so
//! this wrapper owns the DER and re-parses on demand — the pattern
//! `x509-parser` itself documents for long-lived owned certificates. Most
//! queries (validity, key usage, basic constraints, AIA, signature
//! verification) go through `x509-parser`'s typed extension API; the three
//! raw byte spans CMS/ESS need verbatim (`issuer` Name, `subject` Name,
//! `SubjectPublicKeyInfo`) are pulled out with our own [`crate::codec::der`]
//! walk over `TBSCertificate` so the bytes we embed in `IssuerSerial` and
//! sign over are provably identical to what the CA encoded — not a
//! re-serialization of a parsed model that could legally re-encode the same
//! values differently.

use crate::codec::der;
use crate::codec::digest::sha256;
use crate::error::{Error, Result};
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::prelude::*;

/// Key-usage bits this crate cares about (PAdES only ever asks about
/// `digitalSignature` / `nonRepudiation`).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyUsageFlags {
    pub digital_signature: bool,
    pub non_repudiation: bool,
}

/// `basicConstraints` extension value.
#[derive(Debug, Clone, Copy)]
pub struct BasicConstraintsInfo {
    pub ca: bool,
    pub path_len_constraint: Option<u32>,
}

/// An owned X.509 certificate.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
}

/// The raw byte spans of a `TBSCertificate` this crate needs verbatim.
struct TbsSpans {
    serial_magnitude: Vec<u8>,
    issuer_name_der: Vec<u8>,
    subject_name_der: Vec<u8>,
    spki_der: Vec<u8>,
}

impl Certificate {
    /// Wrap already-parsed DER bytes. Fails if the DER does not parse as an
    /// X.509 certificate.
    pub fn from_der(der_bytes: Vec<u8>) -> Result<Self> {
        X509Certificate::from_der(&der_bytes)
            .map_err(|e| Error::InvalidCertificate(format!("malformed certificate DER: {e}")))?;
        Ok(Certificate { der: der_bytes })
    }

    /// Parse a PEM-encoded certificate (`-----BEGIN CERTIFICATE-----`).
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let der_bytes = crate::codec::encoding::pem_to_der(pem_str)
            .map_err(|e| Error::InvalidCertificate(format!("invalid certificate PEM: {e}")))?;
        Self::from_der(der_bytes)
    }

    /// The certificate's full DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    fn parsed(&self) -> Result<X509Certificate<'_>> {
        let (_, cert) = X509Certificate::from_der(&self.der)
            .map_err(|e| Error::InvalidCertificate(format!("malformed certificate DER: {e}")))?;
        Ok(cert)
    }

    fn tbs_spans(&self) -> Result<TbsSpans> {
        let cert_value = der::parse_der(&self.der)?;
        let cert_fields = cert_value.children()?;
        let tbs = cert_fields
            .first()
            .ok_or_else(|| Error::InvalidCertificate("Certificate missing tbsCertificate".to_string()))?;
        let fields = tbs.children()?;

        let mut idx = 0;
        if fields.first().map(|f| f.tag) == Some(0xa0) {
            idx += 1; // [0] EXPLICIT version, defaulted otherwise
        }
        let serial_magnitude = fields
            .get(idx)
            .ok_or_else(|| Error::InvalidCertificate("TBSCertificate missing serialNumber".to_string()))?
            .as_integer_bytes()
            .to_vec();
        idx += 1;
        idx += 1; // signature AlgorithmIdentifier
        let issuer_name_der = fields
            .get(idx)
            .ok_or_else(|| Error::InvalidCertificate("TBSCertificate missing issuer".to_string()))?
            .raw
            .clone();
        idx += 1;
        idx += 1; // validity
        let subject_name_der = fields
            .get(idx)
            .ok_or_else(|| Error::InvalidCertificate("TBSCertificate missing subject".to_string()))?
            .raw
            .clone();
        idx += 1;
        let spki_der = fields
            .get(idx)
            .ok_or_else(|| Error::InvalidCertificate("TBSCertificate missing subjectPublicKeyInfo".to_string()))?
            .raw
            .clone();

        Ok(TbsSpans {
            serial_magnitude,
            issuer_name_der,
            subject_name_der,
            spki_der,
        })
    }

    /// Subject DN in a canonical, directly comparable string form.
    pub fn subject_canonical(&self) -> Result<String> {
        Ok(self.parsed()?.subject().to_string())
    }

    /// Issuer DN in a canonical, directly comparable string form.
    pub fn issuer_canonical(&self) -> Result<String> {
        Ok(self.parsed()?.issuer().to_string())
    }

    /// Raw DER of the `issuer` `Name` field, verbatim as the CA encoded it.
    pub fn issuer_name_der(&self) -> Result<Vec<u8>> {
        Ok(self.tbs_spans()?.issuer_name_der)
    }

    /// Raw DER of the `subject` `Name` field, verbatim as the CA encoded it.
    pub fn subject_name_der(&self) -> Result<Vec<u8>> {
        Ok(self.tbs_spans()?.subject_name_der)
    }

    /// Raw DER of `SubjectPublicKeyInfo`.
    pub fn spki_der(&self) -> Result<Vec<u8>> {
        Ok(self.tbs_spans()?.spki_der)
    }

    /// Serial number as a big-endian magnitude (no leading sign-pad byte).
    pub fn serial_magnitude(&self) -> Result<Vec<u8>> {
        Ok(self.tbs_spans()?.serial_magnitude)
    }

    /// `notBefore` as a Unix timestamp.
    pub fn not_before_timestamp(&self) -> Result<i64> {
        Ok(self.parsed()?.validity().not_before.timestamp())
    }

    /// `notAfter` as a Unix timestamp.
    pub fn not_after_timestamp(&self) -> Result<i64> {
        Ok(self.parsed()?.validity().not_after.timestamp())
    }

    /// Whether `now` falls within `[notBefore, notAfter]`.
    pub fn is_valid_at(&self, now: chrono::DateTime<chrono::Utc>) -> Result<bool> {
        let ts = now.timestamp();
        Ok(ts >= self.not_before_timestamp()? && ts <= self.not_after_timestamp()?)
    }

    /// The `keyUsage` extension, if present.
    pub fn key_usage(&self) -> Result<Option<KeyUsageFlags>> {
        let cert = self.parsed()?;
        for ext in cert.extensions() {
            if let ParsedExtension::KeyUsage(ku) = ext.parsed_extension() {
                return Ok(Some(KeyUsageFlags {
                    digital_signature: ku.digital_signature(),
                    non_repudiation: ku.non_repudiation(),
                }));
            }
        }
        Ok(None)
    }

    /// `true` if `keyUsage` is absent (permissive default) or grants
    /// `digitalSignature` or `nonRepudiation`.
    pub fn has_signing_usage(&self) -> Result<bool> {
        match self.key_usage()? {
            None => Ok(true),
            Some(ku) => Ok(ku.digital_signature || ku.non_repudiation),
        }
    }

    /// The `basicConstraints` extension, if present.
    pub fn basic_constraints(&self) -> Result<Option<BasicConstraintsInfo>> {
        let cert = self.parsed()?;
        for ext in cert.extensions() {
            if let ParsedExtension::BasicConstraints(bc) = ext.parsed_extension() {
                return Ok(Some(BasicConstraintsInfo {
                    ca: bc.ca,
                    path_len_constraint: bc.path_len_constraint,
                }));
            }
        }
        Ok(None)
    }

    /// CA-Issuers URLs from the Authority Information Access extension
    /// (`1.3.6.1.5.5.7.1.1`, accessMethod `1.3.6.1.5.5.7.48.2`).
    pub fn aia_ca_issuer_urls(&self) -> Result<Vec<String>> {
        let cert = self.parsed()?;
        let mut urls = Vec::new();
        for ext in cert.extensions() {
            if let ParsedExtension::AuthorityInfoAccess(aia) = ext.parsed_extension() {
                for desc in &aia.accessdescs {
                    if desc.access_method.to_string() == crate::asn1::oid::AD_CA_ISSUERS {
                        if let GeneralName::URI(uri) = &desc.access_location {
                            urls.push(uri.to_string());
                        }
                    }
                }
            }
        }
        Ok(urls)
    }

    /// Whether subject and issuer DERs are byte-identical — the stop rule
    /// `ChainBuilder` and `ChainValidator` use to recognize a self-signed
    /// root without attempting a signature check.
    pub fn is_self_signed(&self) -> Result<bool> {
        Ok(self.subject_name_der()? == self.issuer_name_der()?)
    }

    /// SHA-256 fingerprint of the full DER, used for trusted-root matching.
    pub fn fingerprint_sha256(&self) -> [u8; 32] {
        sha256(&self.der)
    }

    /// Verify that this certificate was signed by `issuer`'s key.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<bool> {
        let cert = self.parsed()?;
        let issuer_cert = issuer.parsed()?;
        match cert.verify_signature(Some(issuer_cert.public_key())) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    /// Verify a self-signed certificate against its own embedded key.
    pub fn verify_self_signature(&self) -> Result<bool> {
        let cert = self.parsed()?;
        match cert.verify_signature(None) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    /// Parse an RSA public key out of `SubjectPublicKeyInfo` for use with
    /// the `rsa` crate's PKCS#1 v1.5 verifier.
    pub fn rsa_public_key(&self) -> Result<rsa::RsaPublicKey> {
        use rsa::pkcs8::DecodePublicKey;
        let spki = self.spki_der()?;
        rsa::RsaPublicKey::from_public_key_der(&spki)
            .map_err(|e| Error::InvalidCertificate(format!("not an RSA public key: {e}")))
    }
}
