//! Hand-rolled RFC 5652 (CMS) `ContentInfo` / `SignedData` / `SignerInfo`.
//!
//! Field shapes follow the RustCrypto `cms` crate's `SignedData` (seen in
//! `examples/other_examples/ad9ac621_...signed_data.rs`) for naming, but
//! the encode/decode itself is hand-rolled over [`crate::codec::der`] — see
//! `DESIGN.md` for why this crate doesn't depend on the `cms`/`der` crates.
//!
//! ```text
//! ContentInfo ::= SEQUENCE {
//!     contentType   ContentType,
//!     content       [0] EXPLICIT ANY DEFINED BY contentType }
//!
//! SignedData ::= SEQUENCE {
//!     version            CMSVersion,
//!     digestAlgorithms   SET OF AlgorithmIdentifier,
//!     encapContentInfo   EncapsulatedContentInfo,
//!     certificates       [0] IMPLICIT CertificateSet OPTIONAL,
//!     crls               [1] IMPLICIT RevocationInfoChoices OPTIONAL,
//!     signerInfos        SET OF SignerInfo }
//!
//! SignerInfo ::= SEQUENCE {
//!     version            CMSVersion,
//!     sid                SignerIdentifier,
//!     digestAlgorithm    AlgorithmIdentifier,
//!     signedAttrs        [0] IMPLICIT SignedAttributes OPTIONAL,
//!     signatureAlgorithm AlgorithmIdentifier,
//!     signature          OCTET STRING,
//!     unsignedAttrs      [1] IMPLICIT UnsignedAttributes OPTIONAL }
//! ```
//!
//! This crate's own output never includes `crls`, and `certificates` is
//! never canonically sorted (CMS tooling in practice treats it
//! positionally, matching chain order, despite the ASN.1 `SET OF` syntax).

use crate::asn1::{ess, oid};
use crate::codec::der;
use crate::error::{Error, Result};

/// `AlgorithmIdentifier ::= SEQUENCE { algorithm OID, parameters ANY OPTIONAL }`.
pub fn algorithm_identifier(oid_str: &str, with_null_params: bool) -> Result<Vec<u8>> {
    let oid_der = der::object_identifier(oid_str)?;
    if with_null_params {
        Ok(der::sequence(&[oid_der, der::null()]))
    } else {
        Ok(der::sequence(&[oid_der]))
    }
}

/// `IssuerAndSerialNumber ::= SEQUENCE { issuer Name, serialNumber CertificateSerialNumber }`.
///
/// `issuer_name_der` is the signer certificate's `issuer` `Name` field,
/// taken verbatim (already a full `SEQUENCE` TLV) so it matches whatever
/// the issuing CA actually encoded.
pub fn issuer_and_serial_number(issuer_name_der: &[u8], serial_magnitude: &[u8]) -> Vec<u8> {
    der::sequence(&[issuer_name_der.to_vec(), der::integer_unsigned(serial_magnitude)])
}

/// `EncapsulatedContentInfo` for a detached signature: `eContent` absent.
pub fn encapsulated_content_info_detached() -> Result<Vec<u8>> {
    let econtent_type = der::object_identifier(oid::ID_DATA)?;
    Ok(der::sequence(&[econtent_type]))
}

/// `EncapsulatedContentInfo` carrying an embedded `eContent` (e.g. a TSA
/// token's `TSTInfo`, which RFC 3161 §2.4.2 requires non-detached).
pub fn encapsulated_content_info_with_content(content_type_oid: &str, econtent: &[u8]) -> Result<Vec<u8>> {
    let econtent_type = der::object_identifier(content_type_oid)?;
    let wrapped = der::context_explicit(0, &der::octet_string(econtent));
    Ok(der::sequence(&[econtent_type, wrapped]))
}

/// `[0] IMPLICIT CertificateSet`: the concatenation of each certificate's
/// own DER, wrapped in a context-specific constructed tag 0.
pub fn certificates_field(certs_der: &[Vec<u8>]) -> Vec<u8> {
    let mut contents = Vec::new();
    for c in certs_der {
        contents.extend_from_slice(c);
    }
    der::tlv(0xa0, &contents)
}

/// Parameters needed to assemble one `SignerInfo`.
pub struct SignerInfoParams<'a> {
    pub issuer_name_der: &'a [u8],
    pub serial_magnitude: &'a [u8],
    /// Full DER of the `SET OF Attribute` (tag `0x31`) as produced by
    /// [`crate::asn1::attributes::build_signed_attributes_der`].
    pub signed_attrs_der: &'a [u8],
    pub signature: &'a [u8],
    /// Full DER of the unsigned-attributes `SET OF Attribute` (tag `0x31`),
    /// if any (the timestamp token attribute for PAdES-B-T).
    pub unsigned_attrs_der: Option<&'a [u8]>,
}

/// Build a `SignerInfo` SEQUENCE.
pub fn build_signer_info(params: SignerInfoParams) -> Result<Vec<u8>> {
    let version = der::integer_u64(1);
    let sid = issuer_and_serial_number(params.issuer_name_der, params.serial_magnitude);
    let digest_algorithm = ess::sha256_algorithm_identifier()?;
    let signed_attrs = der::context_implicit_constructed(0, params.signed_attrs_der)?;
    let signature_algorithm = algorithm_identifier(oid::SHA256_WITH_RSA_ENCRYPTION, true)?;
    let signature = der::octet_string(params.signature);

    let mut members = vec![version, sid, digest_algorithm, signed_attrs, signature_algorithm, signature];
    if let Some(ua) = params.unsigned_attrs_der {
        members.push(der::context_implicit_constructed(1, ua)?);
    }
    Ok(der::sequence(&members))
}

/// Parameters needed to assemble a `SignedData`.
pub struct SignedDataParams<'a> {
    pub certs_der: &'a [Vec<u8>],
    /// Full DER of the one `SignerInfo` SEQUENCE this crate always emits.
    pub signer_info_der: &'a [u8],
}

/// Build a `SignedData` SEQUENCE.
pub fn build_signed_data(params: SignedDataParams) -> Result<Vec<u8>> {
    let version = der::integer_u64(1);
    let digest_algorithms = der::set_ordered(&[ess::sha256_algorithm_identifier()?]);
    let encap_content_info = encapsulated_content_info_detached()?;
    let certificates = certificates_field(params.certs_der);
    let signer_infos = der::set_ordered(&[params.signer_info_der.to_vec()]);
    Ok(der::sequence(&[
        version,
        digest_algorithms,
        encap_content_info,
        certificates,
        signer_infos,
    ]))
}

/// Build the outer `ContentInfo` SEQUENCE wrapping `content_der` (a full
/// TLV, e.g. a `SignedData` SEQUENCE or a TSA `TSTInfo`-bearing `SignedData`)
/// under the given content type OID.
pub fn build_content_info(content_type_oid: &str, content_der: &[u8]) -> Result<Vec<u8>> {
    let oid_der = der::object_identifier(content_type_oid)?;
    let content = der::context_explicit(0, content_der);
    Ok(der::sequence(&[oid_der, content]))
}

/// A parsed `ContentInfo`.
#[derive(Debug, Clone)]
pub struct ParsedContentInfo {
    pub content_type_oid: String,
    /// Full DER (tag included) of the wrapped content.
    pub content_der: Vec<u8>,
}

/// Parse a `ContentInfo` SEQUENCE.
pub fn parse_content_info(data: &[u8]) -> Result<ParsedContentInfo> {
    let value = der::parse_der(data)?;
    if !value.is_sequence() {
        return Err(Error::InputMalformed("ContentInfo is not a SEQUENCE".to_string()));
    }
    let fields = value.children()?;
    if fields.len() != 2 {
        return Err(Error::InputMalformed(
            "ContentInfo must have exactly contentType and content".to_string(),
        ));
    }
    let content_type_oid = fields[0].as_oid_string();
    let inner = der::parse_der(&fields[1].contents)?;
    Ok(ParsedContentInfo {
        content_type_oid,
        content_der: inner.raw,
    })
}

/// A parsed `SignerInfo`.
#[derive(Debug, Clone)]
pub struct ParsedSignerInfo {
    pub version: u64,
    pub issuer_name_der: Vec<u8>,
    pub serial_magnitude: Vec<u8>,
    pub digest_algorithm_oid: String,
    /// Full DER of `SET OF Attribute` (tag `0x31`), reconstructed from the
    /// `[0] IMPLICIT` field. Empty if `signedAttrs` was absent.
    pub signed_attrs_der: Vec<u8>,
    pub signature_algorithm_oid: String,
    pub signature: Vec<u8>,
    /// Full DER of `SET OF Attribute` (tag `0x31`) for `unsignedAttrs`, if present.
    pub unsigned_attrs_der: Option<Vec<u8>>,
}

fn parse_signer_info(value: &der::Value) -> Result<ParsedSignerInfo> {
    if !value.is_sequence() {
        return Err(Error::InputMalformed("SignerInfo is not a SEQUENCE".to_string()));
    }
    let fields = value.children()?;
    let mut idx = 0;

    let version = fields
        .get(idx)
        .ok_or_else(|| Error::InputMalformed("SignerInfo missing version".to_string()))?
        .as_u64();
    idx += 1;

    let sid = fields
        .get(idx)
        .ok_or_else(|| Error::InputMalformed("SignerInfo missing sid".to_string()))?;
    idx += 1;
    let (issuer_name_der, serial_magnitude) = if sid.tag == der::tag::SEQUENCE {
        let sid_fields = sid.children()?;
        if sid_fields.len() != 2 {
            return Err(Error::InputMalformed("IssuerAndSerialNumber malformed".to_string()));
        }
        (sid_fields[0].raw.clone(), sid_fields[1].as_integer_bytes().to_vec())
    } else {
        // SubjectKeyIdentifier CHOICE: tolerated on parse, not produced by this crate.
        (Vec::new(), sid.contents.clone())
    };

    let digest_algorithm_oid = {
        let f = fields
            .get(idx)
            .ok_or_else(|| Error::InputMalformed("SignerInfo missing digestAlgorithm".to_string()))?;
        idx += 1;
        f.children()?
            .first()
            .ok_or_else(|| Error::InputMalformed("AlgorithmIdentifier missing OID".to_string()))?
            .as_oid_string()
    };

    let mut signed_attrs_der = Vec::new();
    if let Some(f) = fields.get(idx) {
        if f.tag == 0xa0 {
            signed_attrs_der = der::tlv(der::tag::SET, &f.contents);
            idx += 1;
        }
    }

    let signature_algorithm_oid = {
        let f = fields
            .get(idx)
            .ok_or_else(|| Error::InputMalformed("SignerInfo missing signatureAlgorithm".to_string()))?;
        idx += 1;
        f.children()?
            .first()
            .ok_or_else(|| Error::InputMalformed("AlgorithmIdentifier missing OID".to_string()))?
            .as_oid_string()
    };

    let signature = fields
        .get(idx)
        .ok_or_else(|| Error::InputMalformed("SignerInfo missing signature".to_string()))?
        .contents
        .clone();
    idx += 1;

    let unsigned_attrs_der = fields.get(idx).filter(|f| f.tag == 0xa1).map(|f| der::tlv(der::tag::SET, &f.contents));

    Ok(ParsedSignerInfo {
        version,
        issuer_name_der,
        serial_magnitude,
        digest_algorithm_oid,
        signed_attrs_der,
        signature_algorithm_oid,
        signature,
        unsigned_attrs_der,
    })
}

/// A parsed `SignedData`.
#[derive(Debug, Clone)]
pub struct ParsedSignedData {
    pub version: u64,
    pub econtent_type: String,
    /// `eContent` payload bytes, if present (absent for detached signatures;
    /// present for e.g. a TSA's `TSTInfo`-bearing token).
    pub econtent: Option<Vec<u8>>,
    pub certificates_der: Vec<Vec<u8>>,
    pub signer_infos: Vec<ParsedSignerInfo>,
}

/// Parse a `SignedData` SEQUENCE.
pub fn parse_signed_data(data: &[u8]) -> Result<ParsedSignedData> {
    let value = der::parse_der(data)?;
    if !value.is_sequence() {
        return Err(Error::InputMalformed("SignedData is not a SEQUENCE".to_string()));
    }
    let fields = value.children()?;
    let mut idx = 0;

    let version = fields
        .get(idx)
        .ok_or_else(|| Error::InputMalformed("SignedData missing version".to_string()))?
        .as_u64();
    idx += 1;
    idx += 1; // digestAlgorithms SET, not needed structurally

    let encap = fields
        .get(idx)
        .ok_or_else(|| Error::InputMalformed("SignedData missing encapContentInfo".to_string()))?;
    idx += 1;
    let encap_fields = encap.children()?;
    let econtent_type = encap_fields
        .first()
        .ok_or_else(|| Error::InputMalformed("EncapsulatedContentInfo missing eContentType".to_string()))?
        .as_oid_string();
    let econtent = match encap_fields.get(1) {
        Some(f) if f.tag == 0xa0 => Some(der::parse_der(&f.contents)?.contents),
        _ => None,
    };

    let mut certificates_der = Vec::new();
    if let Some(f) = fields.get(idx) {
        if f.tag == 0xa0 {
            certificates_der = der::parse_der_sequence(&f.contents)?.into_iter().map(|v| v.raw).collect();
            idx += 1;
        }
    }
    if let Some(f) = fields.get(idx) {
        if f.tag == 0xa1 {
            idx += 1; // crls, not used
        }
    }

    let signer_infos_set = fields
        .get(idx)
        .ok_or_else(|| Error::InputMalformed("SignedData missing signerInfos".to_string()))?;
    let mut signer_infos = Vec::new();
    for si in signer_infos_set.children()? {
        signer_infos.push(parse_signer_info(&si)?);
    }

    Ok(ParsedSignedData {
        version,
        econtent_type,
        econtent,
        certificates_der,
        signer_infos,
    })
}
