//! `AttrBuilder`: the signed-attributes component of the three-call
//! workflow (spec.md §4.3). Wraps [`crate::asn1::attributes`] with the
//! certificate-derived inputs — cert hash, issuer/serial — and the
//! certificate validity checks the spec asks `presign` to perform before
//! handing bytes to the external signer.
//!
//! Grounded in the teacher's `PdfSigner` (`src/signatures/signer.rs`):
//! same shape (a small struct wrapping the lower-level codec, one
//! `build_*` method per concern), generalized from a hand-built dictionary
//! string to a canonical CMS `signedAttrs` DER blob.

use crate::asn1::{attributes, ess};
use crate::error::{Error, Result};
use crate::x509::Certificate;

/// Builds the canonical `signedAttrs` DER for a given signer certificate
/// and message digest.
pub struct AttrBuilder;

impl AttrBuilder {
    /// Validate that `cert` is usable as a PAdES signing certificate:
    /// `keyUsage`, if present, must grant `digitalSignature` or
    /// `nonRepudiation`.
    pub fn validate_signer_certificate(cert: &Certificate) -> Result<()> {
        if !cert.has_signing_usage()? {
            return Err(Error::InvalidCertificate(
                "certificate keyUsage does not permit digital signatures".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the `SigningCertificateV2` `IssuerSerial` from the signer
    /// certificate's own issuer Name and serial number — this crate always
    /// self-references the signer's own issuer/serial, never a chain peer's.
    fn issuer_serial_for(cert: &Certificate) -> Result<Vec<u8>> {
        let issuer_name_der = cert.issuer_name_der()?;
        let serial_magnitude = cert.serial_magnitude()?;
        Ok(ess::issuer_serial(&issuer_name_der, &serial_magnitude))
    }

    /// Build the canonical `SET OF Attribute` DER (`contentType`,
    /// `messageDigest`, `signingCertificateV2`) for `message_digest` signed
    /// by `signer_cert`. This is exactly the byte sequence `presign`
    /// returns to the caller for external signing (spec.md §4.3, §4.4.1).
    pub fn build(signer_cert: &Certificate, message_digest: &[u8]) -> Result<Vec<u8>> {
        Self::validate_signer_certificate(signer_cert)?;
        let cert_hash = signer_cert.fingerprint_sha256();
        let issuer_serial_der = Self::issuer_serial_for(signer_cert)?;
        attributes::build_signed_attributes_der(message_digest, &cert_hash, Some(issuer_serial_der))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cert() -> Certificate {
        let pem = include_str!("../tests/fixtures/signer_cert.pem");
        Certificate::from_pem(pem).unwrap()
    }

    #[test]
    fn test_build_signed_attrs_for_fixture_cert() {
        let cert = test_cert();
        let digest = crate::codec::digest::sha256(b"byte range contents");
        let der_bytes = AttrBuilder::build(&cert, &digest).unwrap();

        let parsed = attributes::parse_signed_attributes(&der_bytes).unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(attributes::find_attribute(&parsed, crate::asn1::oid::SIGNING_CERTIFICATE_V2).is_some());
        assert!(attributes::find_attribute(&parsed, crate::asn1::oid::MESSAGE_DIGEST).is_some());
        assert!(attributes::find_attribute(&parsed, crate::asn1::oid::CONTENT_TYPE).is_some());
    }

    #[test]
    fn test_validate_signer_certificate_accepts_fixture() {
        let cert = test_cert();
        assert!(AttrBuilder::validate_signer_certificate(&cert).is_ok());
    }
}
