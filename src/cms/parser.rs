//! Parse a `ContentInfo`/`SignedData` back into the pieces `Verifier` and
//! `finalize`'s byte-equality check need.
//!
//! Grounded in the teacher's read-side (`src/parser/mod.rs`): parse once into
//! a typed view, then let callers query it — mirrored here for CMS instead
//! of PDF objects.

use crate::asn1::{attributes, oid, rfc5652};
use crate::codec::der;
use crate::error::{Error, Result};
use crate::x509::Certificate;

/// A `SignedData` parsed out of a PAdES `/Contents` blob, with certificates
/// already materialized as [`Certificate`]s.
#[derive(Debug, Clone)]
pub struct ParsedCms {
    pub certificates: Vec<Certificate>,
    pub signer_info: rfc5652::ParsedSignerInfo,
    pub signed_attrs: Vec<attributes::ParsedAttribute>,
}

/// The decoded `signatureTimeStampToken` unsigned attribute.
#[derive(Debug, Clone)]
pub struct TimestampAttribute {
    pub token_der: Vec<u8>,
}

/// Parse `cms_der` (the decoded `/Contents` bytes: a `ContentInfo` wrapping
/// a `SignedData`). Rejects anything but `id-signedData` content, and any
/// `SignedData` that does not carry exactly the one `SignerInfo` this crate
/// always emits.
pub fn parse(cms_der: &[u8]) -> Result<ParsedCms> {
    let content_info = rfc5652::parse_content_info(cms_der)?;
    if content_info.content_type_oid != oid::ID_SIGNED_DATA {
        return Err(Error::InputMalformed(format!(
            "ContentInfo contentType is not signedData: {}",
            content_info.content_type_oid
        )));
    }
    let signed_data = rfc5652::parse_signed_data(&content_info.content_der)?;
    if signed_data.econtent.is_some() {
        return Err(Error::InputMalformed(
            "PAdES SignedData must be detached (eContent present)".to_string(),
        ));
    }
    let signer_info = signed_data
        .signer_infos
        .into_iter()
        .next()
        .ok_or_else(|| Error::InputMalformed("SignedData has no SignerInfo".to_string()))?;

    let certificates = signed_data
        .certificates_der
        .into_iter()
        .map(Certificate::from_der)
        .collect::<Result<Vec<_>>>()?;

    if signer_info.signed_attrs_der.is_empty() {
        return Err(Error::InputMalformed("SignerInfo has no signedAttrs".to_string()));
    }
    let signed_attrs = attributes::parse_signed_attributes(&signer_info.signed_attrs_der)?;

    Ok(ParsedCms {
        certificates,
        signer_info,
        signed_attrs,
    })
}

/// `selectSignerCertificate` (spec.md §4.8): match `signerInfo.sid` against
/// each certificate's own issuer/serial, falling back to the first
/// certificate when no match is found (tolerates producers that include a
/// chain in an order this crate didn't choose).
pub fn select_signer_certificate<'a>(cms: &'a ParsedCms) -> Result<&'a Certificate> {
    for cert in &cms.certificates {
        let issuer_matches = cert.issuer_name_der()? == cms.signer_info.issuer_name_der;
        let serial_matches = cert.serial_magnitude()? == cms.signer_info.serial_magnitude;
        if issuer_matches && serial_matches {
            return Ok(cert);
        }
    }
    cms.certificates
        .first()
        .ok_or_else(|| Error::SignatureInvalid("SignedData carries no certificates".to_string()))
}

/// Extract the `signatureTimeStampToken` unsigned attribute, if present.
pub fn timestamp_attribute(cms: &ParsedCms) -> Result<Option<TimestampAttribute>> {
    let Some(unsigned_attrs_der) = &cms.signer_info.unsigned_attrs_der else {
        return Ok(None);
    };
    let parsed = attributes::parse_signed_attributes(unsigned_attrs_der)?;
    let Some(attr) = attributes::find_attribute(&parsed, oid::ID_AA_SIGNATURE_TIME_STAMP_TOKEN) else {
        return Ok(None);
    };
    let token_der = attr
        .value_ders
        .first()
        .ok_or_else(|| Error::InputMalformed("signatureTimeStampToken attribute has no value".to_string()))?
        .clone();
    Ok(Some(TimestampAttribute { token_der }))
}

/// Reconstruct the exact `signedAttrs` DER this `SignerInfo`'s signature was
/// computed over (canonical `SET OF Attribute` re-emitted from the parsed
/// attributes, not the raw `[0] IMPLICIT` bytes, which have a different tag).
pub fn signed_attrs_der(cms: &ParsedCms) -> Vec<u8> {
    attributes::reemit_signed_attributes(&cms.signed_attrs)
}

/// Decode the `messageDigest` signed attribute's value.
pub fn message_digest(cms: &ParsedCms) -> Result<Vec<u8>> {
    let attr = attributes::find_attribute(&cms.signed_attrs, oid::MESSAGE_DIGEST)
        .ok_or_else(|| Error::InputMalformed("signedAttrs missing messageDigest".to_string()))?;
    let value_der = attr
        .value_ders
        .first()
        .ok_or_else(|| Error::InputMalformed("messageDigest attribute has no value".to_string()))?;
    let value = der::parse_der(value_der)?;
    Ok(value.contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::ess;
    use crate::codec::digest::sha256;

    fn fixture_cert() -> Certificate {
        Certificate::from_pem(include_str!("../../tests/fixtures/signer_cert.pem")).unwrap()
    }

    fn build_sample(unsigned_attrs_der: Option<Vec<u8>>) -> (Vec<u8>, [u8; 32], Certificate) {
        let cert = fixture_cert();
        let digest = sha256(b"byte range contents");
        let cert_hash = cert.fingerprint_sha256();
        let issuer_serial = ess::issuer_serial(&cert.issuer_name_der().unwrap(), &cert.serial_magnitude().unwrap());
        let signed_attrs = attributes::build_signed_attributes_der(&digest, &cert_hash, Some(issuer_serial)).unwrap();

        let signer_info = rfc5652::build_signer_info(rfc5652::SignerInfoParams {
            issuer_name_der: &cert.issuer_name_der().unwrap(),
            serial_magnitude: &cert.serial_magnitude().unwrap(),
            signed_attrs_der: &signed_attrs,
            signature: b"fake signature bytes",
            unsigned_attrs_der: unsigned_attrs_der.as_deref(),
        })
        .unwrap();

        let signed_data = rfc5652::build_signed_data(rfc5652::SignedDataParams {
            certs_der: &[cert.der().to_vec()],
            signer_info_der: &signer_info,
        })
        .unwrap();
        let cms_der = rfc5652::build_content_info(oid::ID_SIGNED_DATA, &signed_data).unwrap();
        (cms_der, digest, cert)
    }

    #[test]
    fn test_parse_selects_signer_certificate_by_issuer_and_serial() {
        let (cms_der, _digest, cert) = build_sample(None);
        let parsed = parse(&cms_der).unwrap();
        let selected = select_signer_certificate(&parsed).unwrap();
        assert_eq!(selected.der(), cert.der());
    }

    #[test]
    fn test_message_digest_roundtrips() {
        let (cms_der, digest, _cert) = build_sample(None);
        let parsed = parse(&cms_der).unwrap();
        assert_eq!(message_digest(&parsed).unwrap(), digest.to_vec());
    }

    #[test]
    fn test_signed_attrs_der_matches_original_bytes() {
        let cert = fixture_cert();
        let digest = sha256(b"byte range contents");
        let cert_hash = cert.fingerprint_sha256();
        let issuer_serial = ess::issuer_serial(&cert.issuer_name_der().unwrap(), &cert.serial_magnitude().unwrap());
        let original = attributes::build_signed_attributes_der(&digest, &cert_hash, Some(issuer_serial)).unwrap();

        let signer_info = rfc5652::build_signer_info(rfc5652::SignerInfoParams {
            issuer_name_der: &cert.issuer_name_der().unwrap(),
            serial_magnitude: &cert.serial_magnitude().unwrap(),
            signed_attrs_der: &original,
            signature: b"sig",
            unsigned_attrs_der: None,
        })
        .unwrap();
        let signed_data = rfc5652::build_signed_data(rfc5652::SignedDataParams {
            certs_der: &[cert.der().to_vec()],
            signer_info_der: &signer_info,
        })
        .unwrap();
        let cms_der = rfc5652::build_content_info(oid::ID_SIGNED_DATA, &signed_data).unwrap();

        let parsed = parse(&cms_der).unwrap();
        assert_eq!(signed_attrs_der(&parsed), original);
    }

    #[test]
    fn test_timestamp_attribute_absent_without_unsigned_attrs() {
        let (cms_der, _digest, _cert) = build_sample(None);
        let parsed = parse(&cms_der).unwrap();
        assert!(timestamp_attribute(&parsed).unwrap().is_none());
    }

    #[test]
    fn test_timestamp_attribute_present_when_embedded() {
        let fake_token = der::sequence(&[der::integer_u64(7)]);
        let ts_attr = attributes::signature_timestamp_token_attribute(&fake_token).unwrap();
        let unsigned_attrs = der::set_ordered(&[ts_attr]);

        let (cms_der, _digest, _cert) = build_sample(Some(unsigned_attrs));
        let parsed = parse(&cms_der).unwrap();
        let ts = timestamp_attribute(&parsed).unwrap().unwrap();
        assert_eq!(ts.token_der, fake_token);
    }

    #[test]
    fn test_parse_rejects_non_signed_data_content_type() {
        let ci = rfc5652::build_content_info(oid::ID_DATA, &der::octet_string(b"x")).unwrap();
        assert!(parse(&ci).is_err());
    }
}
