//! RFC 5035 (ESS) `SigningCertificateV2` / `ESSCertIDv2` / `IssuerSerial`.
//!
//! ```text
//! SigningCertificateV2 ::= SEQUENCE {
//!     certs        SEQUENCE OF ESSCertIDv2,
//!     policies     SEQUENCE OF PolicyInformation OPTIONAL }
//!
//! ESSCertIDv2 ::= SEQUENCE {
//!     hashAlgorithm   AlgorithmIdentifier DEFAULT {algorithm id-sha256},
//!     certHash        Hash,
//!     issuerSerial    IssuerSerial OPTIONAL }
//!
//! IssuerSerial ::= SEQUENCE {
//!     issuer         GeneralNames,
//!     serialNumber   CertificateSerialNumber }
//! ```
//!
//! This crate always signs over a single signer certificate, so `certs` and
//! `policies` never hold more than one element each and `policies` is
//! always omitted — baseline PAdES does not require a signature policy.

use crate::asn1::oid;
use crate::codec::der;
use crate::error::Result;

/// `AlgorithmIdentifier` for SHA-256 with parameters omitted, per RFC 5754
/// §2 ("MUST omit the parameters field" for SHA-2 family digest algorithms).
pub fn sha256_algorithm_identifier() -> Result<Vec<u8>> {
    let oid = der::object_identifier(oid::SHA256)?;
    Ok(der::sequence(&[oid]))
}

/// `IssuerSerial`: binds the hash to a specific certificate by its issuer
/// DN (already-DER `Name`, taken verbatim from the signer certificate's
/// `issuer` field) and serial number magnitude.
pub fn issuer_serial(issuer_name_der: &[u8], serial_magnitude: &[u8]) -> Vec<u8> {
    // Name is itself a CHOICE (`rdnSequence`), so GeneralName's
    // `directoryName [4]` alternative must be tagged EXPLICIT.
    let general_name = der::context_explicit(4, issuer_name_der);
    let general_names = der::sequence(&[general_name]);
    let serial = der::integer_unsigned(serial_magnitude);
    der::sequence(&[general_names, serial])
}

/// `ESSCertIDv2` for one certificate, with the SHA-256 hash algorithm
/// written out explicitly (safe regardless of which default RFC 5035
/// revision an interpreter assumes).
pub fn ess_cert_id_v2(cert_hash: &[u8; 32], issuer_serial_der: Option<Vec<u8>>) -> Result<Vec<u8>> {
    let mut members = vec![sha256_algorithm_identifier()?, der::octet_string(cert_hash)];
    if let Some(is) = issuer_serial_der {
        members.push(is);
    }
    Ok(der::sequence(&members))
}

/// The `signingCertificateV2` attribute *value* (not the `Attribute`
/// wrapper): `SEQUENCE { SEQUENCE OF ESSCertIDv2 }`.
pub fn signing_certificate_v2(cert_hash: &[u8; 32], issuer_serial_der: Option<Vec<u8>>) -> Result<Vec<u8>> {
    let cert_id = ess_cert_id_v2(cert_hash, issuer_serial_der)?;
    let certs = der::sequence(&[cert_id]);
    Ok(der::sequence(&[certs]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::digest::sha256;

    #[test]
    fn test_sha256_algorithm_identifier_has_no_parameters() {
        let aid = sha256_algorithm_identifier().unwrap();
        let parsed = der::parse_der(&aid).unwrap();
        let children = parsed.children().unwrap();
        // Only the OID, no parameters field.
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].as_oid_string(), oid::SHA256);
    }

    #[test]
    fn test_ess_cert_id_v2_without_issuer_serial() {
        let hash = sha256(b"fake cert der");
        let encoded = ess_cert_id_v2(&hash, None).unwrap();
        let parsed = der::parse_der(&encoded).unwrap();
        let children = parsed.children().unwrap();
        assert_eq!(children.len(), 2); // hashAlgorithm, certHash
        assert_eq!(children[1].contents, hash.to_vec());
    }

    #[test]
    fn test_ess_cert_id_v2_with_issuer_serial() {
        let hash = sha256(b"fake cert der");
        let fake_name_der = der::sequence(&[]); // empty RDNSequence, syntactically valid
        let is = issuer_serial(&fake_name_der, &[0x01]);
        let encoded = ess_cert_id_v2(&hash, Some(is)).unwrap();
        let parsed = der::parse_der(&encoded).unwrap();
        let children = parsed.children().unwrap();
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn test_signing_certificate_v2_structure() {
        let hash = sha256(b"cert");
        let encoded = signing_certificate_v2(&hash, None).unwrap();
        let parsed = der::parse_der(&encoded).unwrap();
        assert!(parsed.is_sequence());
        let outer = parsed.children().unwrap();
        assert_eq!(outer.len(), 1); // certs SEQUENCE OF, policies omitted
        let certs = outer[0].children().unwrap();
        assert_eq!(certs.len(), 1); // exactly one ESSCertIDv2
    }
}
