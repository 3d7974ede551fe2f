//! `CmsAssembler::assemble` (spec.md §4.4): turn a raw RSA signature and the
//! `signedAttrs` it was computed over into a finished CMS `SignedData`,
//! optionally timestamped.
//!
//! Grounded in the teacher's `PdfSigner::sign` (`src/signatures/signer.rs`),
//! which already separated "what gets signed" from "what the external
//! signer returns" — generalized here to an actually-external signer rather
//! than an in-process stub, plus the chain/timestamp collaborators spec.md
//! §9 asks to be injectable.

use crate::asn1::{attributes, oid, rfc5652};
use crate::chain::ChainBuilder;
use crate::config::Config;
use crate::error::Result;
use crate::tsa::TsaClient;
use crate::x509::Certificate;

/// Inputs to [`CmsAssembler::assemble`].
pub struct AssembleRequest<'a> {
    /// The exact `SET OF Attribute` DER `presign` returned to the caller —
    /// re-emitted canonically before assembly, not trusted byte-for-byte,
    /// so a caller that round-tripped it through storage is still safe.
    pub signed_attrs_der: &'a [u8],
    /// Raw RSA PKCS#1 v1.5 signature over `signed_attrs_der`.
    pub signature: &'a [u8],
    pub signer_cert: &'a Certificate,
    /// Intermediates the caller already has on hand. May be empty; the CPS
    /// heuristic (spec.md §4.4 step 5) can still populate the chain from
    /// here when empty.
    pub chain: &'a [Certificate],
    pub with_timestamp: bool,
    pub tsa_url: Option<&'a str>,
}

/// Timestamp token details surfaced back to the caller for reporting.
#[derive(Debug, Clone)]
pub struct TsInfo {
    pub gen_time: String,
    pub accuracy: Option<String>,
    pub serial: Option<String>,
}

/// Output of [`CmsAssembler::assemble`].
pub struct AssembleResult {
    pub cms_der: Vec<u8>,
    /// `false` whenever `withTimestamp` was requested but the TSA call
    /// failed — the signature itself is still valid (B-B).
    pub timestamped: bool,
    pub ts_info: Option<TsInfo>,
}

pub struct CmsAssembler;

impl CmsAssembler {
    /// Drop any certificate in `chain` that is self-signed (a root):
    /// spec.md §4.4 step 2 and §3's `CmsContainer` definition both say root
    /// certificates are never embedded.
    fn non_root_chain(chain: &[Certificate]) -> Result<Vec<Certificate>> {
        let mut out = Vec::new();
        for cert in chain {
            if !cert.is_self_signed()? {
                out.push(cert.clone());
            }
        }
        Ok(out)
    }

    /// Resolve the chain to embed: the caller-supplied chain as-is, unless
    /// it's empty and the signer certificate looks like a CPS certificate,
    /// in which case `chain_builder` populates it (spec.md §4.4 step 5).
    fn resolve_chain(
        req: &AssembleRequest,
        cfg: &Config,
        chain_builder: &dyn ChainBuilder,
    ) -> Result<Vec<Certificate>> {
        if !req.chain.is_empty() {
            return Self::non_root_chain(req.chain);
        }
        let subject = req.signer_cert.subject_canonical()?;
        let issuer = req.signer_cert.issuer_canonical()?;
        if !cfg.looks_like_cps(&subject, &issuer) {
            return Ok(Vec::new());
        }
        let built = chain_builder.build(req.signer_cert, cfg.max_chain_length)?;
        for e in &built.errors {
            log::warn!("CPS chain build: {e}");
        }
        let without_end_entity: Vec<Certificate> = built.chain.into_iter().skip(1).collect();
        Self::non_root_chain(&without_end_entity)
    }

    /// Call the TSA over `signature`, wrap the token as an unsigned
    /// attribute, and report its `TsInfo`. Any failure is swallowed: the
    /// caller gets `None` and a B-B signature rather than a propagated
    /// error (spec.md §4.4 step 4, P6).
    fn try_timestamp(
        signature: &[u8],
        tsa_url: Option<&str>,
        tsa_client: &dyn TsaClient,
    ) -> (Option<Vec<u8>>, bool, Option<TsInfo>) {
        match tsa_client.timestamp(signature, tsa_url) {
            Ok(resp) => {
                let attr = match attributes::signature_timestamp_token_attribute(&resp.token) {
                    Ok(a) => a,
                    Err(e) => {
                        log::warn!("failed to encode signatureTimeStampToken attribute: {e}, downgrading to B-B");
                        return (None, false, None);
                    }
                };
                let unsigned_attrs = crate::codec::der::set_ordered(&[attr]);
                let ts_info = TsInfo {
                    gen_time: resp.gen_time,
                    accuracy: resp.accuracy,
                    serial: resp.serial,
                };
                (Some(unsigned_attrs), true, Some(ts_info))
            }
            Err(e) => {
                log::warn!("TSA call failed, downgrading to B-B: {e}");
                (None, false, None)
            }
        }
    }

    pub fn assemble(
        req: AssembleRequest,
        cfg: &Config,
        tsa_client: &dyn TsaClient,
        chain_builder: &dyn ChainBuilder,
    ) -> Result<AssembleResult> {
        let parsed_attrs = attributes::parse_signed_attributes(req.signed_attrs_der)?;
        let signed_attrs_der = attributes::reemit_signed_attributes(&parsed_attrs);

        let chain = Self::resolve_chain(&req, cfg, chain_builder)?;
        let mut certs_der = vec![req.signer_cert.der().to_vec()];
        certs_der.extend(chain.iter().map(|c| c.der().to_vec()));

        let (unsigned_attrs_der, timestamped, ts_info) = if req.with_timestamp {
            Self::try_timestamp(req.signature, req.tsa_url, tsa_client)
        } else {
            (None, false, None)
        };

        let signer_info_der = rfc5652::build_signer_info(rfc5652::SignerInfoParams {
            issuer_name_der: &req.signer_cert.issuer_name_der()?,
            serial_magnitude: &req.signer_cert.serial_magnitude()?,
            signed_attrs_der: &signed_attrs_der,
            signature: req.signature,
            unsigned_attrs_der: unsigned_attrs_der.as_deref(),
        })?;

        let signed_data = rfc5652::build_signed_data(rfc5652::SignedDataParams {
            certs_der: &certs_der,
            signer_info_der: &signer_info_der,
        })?;
        let cms_der = rfc5652::build_content_info(oid::ID_SIGNED_DATA, &signed_data)?;

        Ok(AssembleResult {
            cms_der,
            timestamped,
            ts_info,
        })
    }
}
