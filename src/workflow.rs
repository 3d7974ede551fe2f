//! The three-call remote-signing workflow (spec.md §2, §6): `prepare` and
//! `presign` and `finalize`, plus `verify`. DTOs here are exactly the
//! base64/PEM request/response shapes spec.md §6's HTTP surface describes —
//! everything below it (`PdfPreparer`, `AttrBuilder`, `CmsAssembler`,
//! `verify::verify`) is a pure function of its inputs, so this module is
//! just the marshalling layer an HTTP/CLI adapter would call directly.
//!
//! Grounded in the teacher's `api` module (`src/api/mod.rs`), which does the
//! same job for PDF extraction: base64/bytes in, a small DTO out, no
//! business logic duplicated from the underlying component.

use crate::attrs::AttrBuilder;
use crate::chain::ChainBuilder;
use crate::cms::assembler::{AssembleRequest, CmsAssembler};
use crate::codec::digest::sha256_concat;
use crate::codec::encoding::{base64_decode, base64_encode};
use crate::config::{Config, SignatureLevel};
use crate::error::{Error, Result};
use crate::pdf::locator::{embed_cms, ByteRange};
use crate::pdf::preparer::{self, PrepareConfig};
use crate::report::VerificationReport;
use crate::tsa::TsaClient;
use crate::verify::{self, VerifyOptions};
use crate::x509::Certificate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequest {
    pub pdf_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareResponse {
    pub prepared_pdf_base64: String,
    pub byte_range: ByteRange,
    pub message_digest_b64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub message_digest_b64: String,
    pub signer_cert_pem: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    pub signed_attrs_der_b64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub prepared_pdf_base64: String,
    pub byte_range: ByteRange,
    pub signed_attrs_der_b64: String,
    pub signature_b64: String,
    pub signer_cert_pem: String,
    pub certificate_chain_pem: Option<Vec<String>>,
    pub with_timestamp: Option<bool>,
    pub tsa_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub signed_pdf_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub pdf_base64: String,
}

/// `POST /pdf/prepare`: emit a prepared PDF with a placeholder signature,
/// plus the ByteRange/digest the external signer needs.
pub fn prepare(req: PrepareRequest, cfg: &Config) -> Result<PrepareResponse> {
    let pdf_bytes = base64_decode(&req.pdf_base64)?;
    let mut prepare_cfg = PrepareConfig::new(cfg.signer_name.clone()).with_placeholder_hex_size(cfg.placeholder_hex_size);
    if let Some(reason) = &cfg.reason {
        prepare_cfg = prepare_cfg.with_reason(reason.clone());
    }
    if let Some(location) = &cfg.location {
        prepare_cfg = prepare_cfg.with_location(location.clone());
    }
    if let Some(contact_info) = &cfg.contact_info {
        prepare_cfg = prepare_cfg.with_contact_info(contact_info.clone());
    }

    let prepared = preparer::prepare(&pdf_bytes, &prepare_cfg)?;
    Ok(PrepareResponse {
        prepared_pdf_base64: base64_encode(&prepared.bytes),
        byte_range: prepared.byte_range,
        message_digest_b64: base64_encode(&prepared.message_digest),
    })
}

/// `POST /pdf/presign`: build the canonical `signedAttrs` DER the external
/// signer must sign. No collaborator needed — pure local computation.
pub fn presign(req: PresignRequest) -> Result<PresignResponse> {
    let message_digest = base64_decode(&req.message_digest_b64)?;
    let cert = Certificate::from_pem(&req.signer_cert_pem)?;
    let signed_attrs_der = AttrBuilder::build(&cert, &message_digest)?;
    Ok(PresignResponse {
        signed_attrs_der_b64: base64_encode(&signed_attrs_der),
    })
}

/// `POST /pdf/finalize`: assemble the CMS container around the externally
/// produced signature and embed it.
///
/// Per spec.md §5's ordering guarantee, this re-derives the `signedAttrs`
/// DER from the prepared PDF's own ByteRange digest and the signer
/// certificate, and requires it to be byte-identical to what the caller
/// supplies — this is what `presign` would have returned for this exact
/// `(prepare, signerCert)` pair, so a caller that threads `prepare`'s
/// digest into a different `presign` call (or edits the digest in transit)
/// is rejected here rather than producing a signature over the wrong bytes.
pub fn finalize(
    req: FinalizeRequest,
    cfg: &Config,
    tsa_client: &dyn TsaClient,
    chain_builder: &dyn ChainBuilder,
) -> Result<FinalizeResponse> {
    let prepared_pdf = base64_decode(&req.prepared_pdf_base64)?;
    req.byte_range.validate(prepared_pdf.len())?;

    let prepare_digest = sha256_concat(&[
        &prepared_pdf[..req.byte_range.b as usize],
        &prepared_pdf[req.byte_range.c as usize..],
    ]);

    let signer_cert = Certificate::from_pem(&req.signer_cert_pem)?;
    let expected_signed_attrs = AttrBuilder::build(&signer_cert, &prepare_digest)?;

    let signed_attrs_der = base64_decode(&req.signed_attrs_der_b64)?;
    if signed_attrs_der != expected_signed_attrs {
        return Err(Error::SignatureInvalid(
            "signedAttrs do not match the digest prepare computed for this signer certificate; \
             presign must be re-run against the current prepare output"
                .to_string(),
        ));
    }

    let signature = base64_decode(&req.signature_b64)?;
    let chain: Vec<Certificate> = req
        .certificate_chain_pem
        .unwrap_or_default()
        .iter()
        .map(|pem| Certificate::from_pem(pem))
        .collect::<Result<Vec<_>>>()?;

    let with_timestamp = req
        .with_timestamp
        .unwrap_or(cfg.signature_level == SignatureLevel::BT);
    let tsa_url = req.tsa_url.as_deref().or(cfg.timestamp_url.as_deref());

    let assemble_req = AssembleRequest {
        signed_attrs_der: &signed_attrs_der,
        signature: &signature,
        signer_cert: &signer_cert,
        chain: &chain,
        with_timestamp,
        tsa_url,
    };
    let assembled = CmsAssembler::assemble(assemble_req, cfg, tsa_client, chain_builder)?;

    let areas = preparer::locate(&prepared_pdf, "Signature1")?;
    let signed_pdf = embed_cms(&prepared_pdf, &areas, req.byte_range, &assembled.cms_der, Some(&prepare_digest))?;

    Ok(FinalizeResponse {
        signed_pdf_base64: base64_encode(&signed_pdf),
    })
}

/// `POST /pdf/verify`.
pub fn verify(req: VerifyRequest, cfg: &Config) -> Result<VerificationReport> {
    let pdf_bytes = base64_decode(&req.pdf_base64)?;
    let options = VerifyOptions {
        now: chrono::Utc::now(),
        trusted_roots: cfg.trusted_roots.clone(),
    };
    verify::verify(&pdf_bytes, &options)
}
