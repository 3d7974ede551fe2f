//! The three PAdES baseline signed attributes and their canonical `SET OF
//! Attribute` encoding.
//!
//! ```text
//! Attribute ::= SEQUENCE {
//!     type    ATTRIBUTE.&id,
//!     values  SET OF ATTRIBUTE.&Type }
//! ```
//!
//! [`build_signed_attributes_der`] is the only place that decides ordering:
//! it DER-encodes each attribute, sorts the three encodings by their own
//! bytes ascending, and concatenates them inside a `SET` tag (P3 — this is
//! the exact bytes the external signer signs, so any other code path that
//! needs the same bytes back — `finalize`'s byte-equality check, `verify`'s
//! signature check — must walk through [`parse_signed_attributes`] /
//! [`reemit_signed_attributes`] rather than re-deriving the sort itself.

use crate::asn1::{ess, oid};
use crate::codec::der;
use crate::error::{Error, Result};

fn attribute(attr_oid: &str, value_der: Vec<u8>) -> Result<Vec<u8>> {
    let oid_der = der::object_identifier(attr_oid)?;
    let values = der::set_ordered(&[value_der]);
    Ok(der::sequence(&[oid_der, values]))
}

/// `contentType` attribute, value `id-data` (PAdES detached signatures
/// always sign over `id-data`, never a richer content type).
pub fn content_type_attribute() -> Result<Vec<u8>> {
    let id_data = der::object_identifier(oid::ID_DATA)?;
    attribute(oid::CONTENT_TYPE, id_data)
}

/// `messageDigest` attribute: the ByteRange SHA-256.
pub fn message_digest_attribute(digest: &[u8]) -> Result<Vec<u8>> {
    attribute(oid::MESSAGE_DIGEST, der::octet_string(digest))
}

/// `signingCertificateV2` attribute binding the signature to the signer
/// certificate's hash (and, optionally, its issuer/serial).
pub fn signing_certificate_v2_attribute(
    cert_hash: &[u8; 32],
    issuer_serial_der: Option<Vec<u8>>,
) -> Result<Vec<u8>> {
    let value = ess::signing_certificate_v2(cert_hash, issuer_serial_der)?;
    attribute(oid::SIGNING_CERTIFICATE_V2, value)
}

/// `signatureTimeStampToken` unsigned attribute (RFC 5035 §5.3): value is
/// the RFC 3161 `TimeStampToken` (a full CMS `ContentInfo`) DER verbatim,
/// not wrapped in an `OCTET STRING`.
pub fn signature_timestamp_token_attribute(token_der: &[u8]) -> Result<Vec<u8>> {
    attribute(oid::ID_AA_SIGNATURE_TIME_STAMP_TOKEN, token_der.to_vec())
}

/// Build the canonical `SET OF Attribute` DER for the three PAdES baseline
/// signed attributes. This is exactly what the external signer signs.
pub fn build_signed_attributes_der(
    message_digest: &[u8],
    cert_hash: &[u8; 32],
    issuer_serial_der: Option<Vec<u8>>,
) -> Result<Vec<u8>> {
    let attrs = vec![
        content_type_attribute()?,
        message_digest_attribute(message_digest)?,
        signing_certificate_v2_attribute(cert_hash, issuer_serial_der)?,
    ];
    Ok(der::set_of(attrs))
}

/// One parsed `Attribute`: its OID, the raw DER of each member of its
/// `values` SET (not re-parsed further — callers decode the value they
/// care about), and the full DER of the `Attribute` SEQUENCE itself (needed
/// to re-sort/re-emit the canonical SET).
#[derive(Debug, Clone)]
pub struct ParsedAttribute {
    pub oid: String,
    pub value_ders: Vec<Vec<u8>>,
    pub raw: Vec<u8>,
}

/// Parse a `SET OF Attribute` DER blob (as produced by
/// [`build_signed_attributes_der`], or extracted from a `SignerInfo`'s
/// `signedAttrs`) into individual attributes.
pub fn parse_signed_attributes(set_der: &[u8]) -> Result<Vec<ParsedAttribute>> {
    let value = der::parse_der(set_der)?;
    if !value.is_set() {
        return Err(Error::InputMalformed(
            "signedAttrs is not a DER SET".to_string(),
        ));
    }
    let mut out = Vec::new();
    for member in value.children()? {
        if !member.is_sequence() {
            return Err(Error::InputMalformed(
                "Attribute is not a DER SEQUENCE".to_string(),
            ));
        }
        let fields = member.children()?;
        if fields.len() != 2 {
            return Err(Error::InputMalformed(
                "Attribute must have exactly type and values".to_string(),
            ));
        }
        let oid_str = fields[0].as_oid_string();
        let value_ders = fields[1].children()?.into_iter().map(|v| v.raw).collect();
        out.push(ParsedAttribute {
            oid: oid_str,
            value_ders,
            raw: member.raw,
        });
    }
    Ok(out)
}

/// Find the first attribute with the given OID.
pub fn find_attribute<'a>(attrs: &'a [ParsedAttribute], oid: &str) -> Option<&'a ParsedAttribute> {
    attrs.iter().find(|a| a.oid == oid)
}

/// Re-emit the canonical `SET OF Attribute` DER from parsed attributes,
/// via the same sort [`build_signed_attributes_der`] uses. Used by
/// `finalize`'s byte-equality check and by `verify` to reconstruct the
/// exact bytes the signature was computed over.
pub fn reemit_signed_attributes(attrs: &[ParsedAttribute]) -> Vec<u8> {
    der::set_of(attrs.iter().map(|a| a.raw.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::digest::sha256;

    fn sample() -> ([u8; 32], [u8; 32]) {
        (sha256(b"byte range contents"), sha256(b"signer certificate der"))
    }

    #[test]
    fn test_build_signed_attributes_der_is_a_set_of_three() {
        let (digest, cert_hash) = sample();
        let der_bytes = build_signed_attributes_der(&digest, &cert_hash, None).unwrap();
        let value = der::parse_der(&der_bytes).unwrap();
        assert!(value.is_set());
        let members = value.children().unwrap();
        assert_eq!(members.len(), 3);
    }

    #[test]
    fn test_no_signing_time_attribute_emitted() {
        let (digest, cert_hash) = sample();
        let der_bytes = build_signed_attributes_der(&digest, &cert_hash, None).unwrap();
        let parsed = parse_signed_attributes(&der_bytes).unwrap();
        assert!(find_attribute(&parsed, oid::SIGNING_TIME).is_none());
    }

    #[test]
    fn test_parse_signed_attributes_roundtrip() {
        let (digest, cert_hash) = sample();
        let der_bytes = build_signed_attributes_der(&digest, &cert_hash, None).unwrap();
        let parsed = parse_signed_attributes(&der_bytes).unwrap();
        assert_eq!(parsed.len(), 3);

        let md_attr = find_attribute(&parsed, oid::MESSAGE_DIGEST).unwrap();
        assert_eq!(md_attr.value_ders.len(), 1);
        let value = der::parse_der(&md_attr.value_ders[0]).unwrap();
        assert_eq!(value.contents, digest.to_vec());
    }

    #[test]
    fn test_reemit_matches_original_bytes() {
        let (digest, cert_hash) = sample();
        let der_bytes = build_signed_attributes_der(&digest, &cert_hash, None).unwrap();
        let parsed = parse_signed_attributes(&der_bytes).unwrap();
        let reemitted = reemit_signed_attributes(&parsed);
        assert_eq!(reemitted, der_bytes);
    }

    /// P3: canonical SET order is independent of the order attributes are
    /// constructed in — `build_signed_attributes_der` always sorts, so
    /// this test builds the same three attributes in a different order via
    /// the lower-level functions and checks the manual sort matches.
    #[test]
    fn test_canonical_sort_independent_of_construction_order() {
        let (digest, cert_hash) = sample();
        let a = content_type_attribute().unwrap();
        let b = message_digest_attribute(&digest).unwrap();
        let c = signing_certificate_v2_attribute(&cert_hash, None).unwrap();

        let via_helper = build_signed_attributes_der(&digest, &cert_hash, None).unwrap();

        let mut manual_order_1 = vec![a.clone(), b.clone(), c.clone()];
        let mut manual_order_2 = vec![c, a, b];
        manual_order_1.sort();
        manual_order_2.sort();
        assert_eq!(manual_order_1, manual_order_2);

        let reemitted = der::set_of(manual_order_1);
        assert_eq!(reemitted, via_helper);
    }
}
